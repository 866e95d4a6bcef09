//! Holdings, items and availability models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::rows::{ElectronicRow, HoldingRow, ItemRow};

/// One 856 occurrence: `$3` linkage, `$u` target, `$z` message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LinkEntry {
    pub linkage: String,
    pub target: String,
    pub message: String,
}

/// Notes, links and holdings statements parsed from MFHD 852/856/866
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MarcHoldingsBlock {
    /// Last 852 `$z`
    pub note: String,
    pub links: Vec<LinkEntry>,
    /// 866 `$a` statements
    pub statements: Vec<String>,
}

/// Circulation snapshot of a holding (its first item, or a remote summary)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Availability {
    pub bib_id: Option<i32>,
    /// Partner record keys, set for remote holdings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partner_keys: Vec<String>,
    pub display_call_no: String,
    pub item_id: Option<i32>,
    pub item_enum: Option<String>,
    pub chron: Option<String>,
    pub item_status: i32,
    pub item_status_desc: String,
    pub item_status_date: Option<NaiveDateTime>,
    /// Permanent location, or a catalog-lookup hyperlink when the partner
    /// catalog could not be reached
    pub perm_location: String,
    pub temp_location: Option<String>,
}

impl Availability {
    pub fn is_blank(&self) -> bool {
        self.perm_location.is_empty() && self.display_call_no.is_empty() && self.item_status_desc.is_empty()
    }
}

impl From<&ItemRow> for Availability {
    fn from(row: &ItemRow) -> Self {
        Self {
            bib_id: Some(row.bib_id),
            partner_keys: Vec::new(),
            display_call_no: row.display_call_no.clone().unwrap_or_default(),
            item_id: Some(row.item_id),
            item_enum: row.item_enum.clone(),
            chron: row.chron.clone(),
            item_status: row.item_status,
            item_status_desc: row.item_status_desc.clone().unwrap_or_default(),
            item_status_date: row.item_status_date,
            perm_location: row.perm_location.clone().unwrap_or_default(),
            temp_location: row.temp_location.clone(),
        }
    }
}

/// MFHD subfields used for electronic resources and summary holdings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ElectronicLink {
    pub mfhd_id: Option<i32>,
    pub link_852a: Option<String>,
    pub link_852h: String,
    pub link_852z: Option<String>,
    pub link_856u: String,
    pub link_856z: String,
    pub link_8563: Option<String>,
    pub link_866: Option<String>,
}

impl From<ElectronicRow> for ElectronicLink {
    fn from(row: ElectronicRow) -> Self {
        Self {
            mfhd_id: Some(row.mfhd_id),
            link_852a: row.link852a,
            link_852h: row.link852h.unwrap_or_default(),
            link_852z: row.link852z,
            link_856u: row.link856u.unwrap_or_default(),
            link_856z: row.link856z.unwrap_or_default(),
            link_8563: row.link8563,
            link_866: row.link866,
        }
    }
}

/// A physical or electronic copy attached to a holding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub item_id: Option<i32>,
    pub bib_id: Option<i32>,
    pub item_enum: Option<String>,
    pub chron: Option<String>,
    pub item_status: i32,
    pub item_status_desc: String,
    pub perm_location: String,
    pub temp_location: Option<String>,
    pub display_call_no: String,
    pub eligible: bool,
    pub library_full_name: String,
    pub trimmed_location_display_name: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            item_id: Some(row.item_id),
            bib_id: Some(row.bib_id),
            item_enum: row.item_enum,
            chron: row.chron,
            item_status: row.item_status,
            item_status_desc: row.item_status_desc.unwrap_or_default(),
            perm_location: row.perm_location.unwrap_or_default(),
            temp_location: row.temp_location,
            display_call_no: row.display_call_no.unwrap_or_default(),
            eligible: false,
            library_full_name: String::new(),
            trimmed_location_display_name: String::new(),
        }
    }
}

/// A library's holding of one of the related bibs
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Holding {
    pub bib_id: i32,
    pub mfhd_id: i32,
    pub location_id: i32,
    pub library_name: String,
    pub library_full_name: String,
    pub display_call_no: String,
    pub location_display_name: String,
    pub trimmed_location_display_name: String,
    pub availability: Option<Availability>,
    pub electronic: Option<ElectronicLink>,
    pub mfhd: MarcHoldingsBlock,
    pub items: Vec<Item>,
    pub eligible: bool,
    /// Summary holdings statements ("library has")
    pub library_has: Vec<String>,
    #[serde(skip)]
    pub remove: bool,
}

impl From<HoldingRow> for Holding {
    fn from(row: HoldingRow) -> Self {
        Self {
            bib_id: row.bib_id,
            mfhd_id: row.mfhd_id,
            location_id: row.location_id,
            library_name: row.library_name,
            display_call_no: row.display_call_no.unwrap_or_default(),
            location_display_name: row.location_display_name.unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Strip a two-character location-code prefix (`"XY: Main Stacks"`)
pub fn trim_location_prefix(name: &str) -> String {
    match name.find(':') {
        Some(idx) if name[..idx].chars().count() == 2 => name[idx + 1..].trim_start().to_string(),
        _ => name.to_string(),
    }
}
