//! Interlibrary loan eligibility
//!
//! Rules are checked in order and the first match decides:
//! law library locations, ineligible libraries, the network marker,
//! ineligible permanent and temporary locations, ineligible statuses.

use crate::config::CatalogConfig;
use crate::models::{Holding, Item};

/// Circulation facts the rules look at
struct Facts<'a> {
    library: &'a str,
    perm_location: &'a str,
    temp_location: &'a str,
    status: &'a str,
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .filter(|needle| !needle.is_empty())
        .any(|needle| haystack.contains(&needle.to_uppercase()))
}

fn is_eligible(config: &CatalogConfig, facts: &Facts<'_>) -> bool {
    let law = &config.law_library;
    if facts.library == law.library && facts.perm_location.contains(&law.marker) {
        return false;
    }
    if config.ineligible_libraries.iter().any(|lib| lib == facts.library) {
        return false;
    }

    let perm = facts.perm_location.to_uppercase();
    let temp = facts.temp_location.to_uppercase();
    let marker = config.network_marker.to_uppercase();
    if !marker.is_empty() && (perm.contains(&marker) || temp.contains(&marker)) {
        return true;
    }
    if contains_any(&perm, &config.ineligible_perm_locations) {
        return false;
    }
    if contains_any(&temp, &config.ineligible_temp_locations) {
        return false;
    }

    let status = facts.status.to_uppercase();
    !config
        .ineligible_statuses
        .iter()
        .any(|s| s.to_uppercase() == status)
}

/// Whether an item of `library` may be requested
pub fn item_eligible(config: &CatalogConfig, item: &Item, library: &str) -> bool {
    is_eligible(
        config,
        &Facts {
            library,
            perm_location: &item.perm_location,
            temp_location: item.temp_location.as_deref().unwrap_or_default(),
            status: &item.item_status_desc,
        },
    )
}

/// Whether a holding may be requested, judged on its availability snapshot
pub fn holding_eligible(config: &CatalogConfig, holding: &Holding) -> bool {
    let Some(availability) = &holding.availability else {
        return false;
    };
    is_eligible(
        config,
        &Facts {
            library: &holding.library_name,
            perm_location: &availability.perm_location,
            temp_location: availability.temp_location.as_deref().unwrap_or_default(),
            status: &availability.item_status_desc,
        },
    )
}
