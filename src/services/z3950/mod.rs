//! Z39.50 service for partner catalog holdings
//!
//! Some libraries keep their holdings in their own catalog rather than the
//! shared database. This service translates a local bib id into the
//! partner's record key, searches the partner catalog and reshapes the
//! response into the same availability, electronic and item structures the
//! local catalog produces. A partner failure never fails the request: the
//! caller gets an empty bundle pointing at the partner's record page.

pub mod dialect;
pub mod session;

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::{PartnerKeyStyle, RemoteServer, Z3950Config},
    error::{AppResult, RemoteError},
    models::{Availability, ElectronicLink, Item, LinkEntry, MarcHoldingsBlock, RemoteRecord},
    repository::CatalogGateway,
};

use dialect::{scraper_for, ScrapeOutcome, NOT_CHARGED};
pub use session::{RemoteConnector, SearchQuery, UseAttribute, Z3950Connector};

#[cfg(test)]
pub use session::MockRemoteConnector;

/// Statuses kept as item rows when scraped from a partner response
const ITEM_STATUSES: [&str; 4] = ["Charged", "Not Charged", "Missing", "LIB USE ONLY"];

/// What to look for in a partner catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    /// A local bib id, translated to the partner's record key
    Bib(i32),
    Isbn(String),
    Issn(String),
    Oclc(String),
}

/// Partner holdings reshaped like a local holding
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RemoteHoldings {
    pub availability: Availability,
    pub electronic: ElectronicLink,
    pub mfhd: MarcHoldingsBlock,
    pub items: Vec<Item>,
}

#[derive(Clone)]
pub struct Z3950Service {
    gateway: Arc<dyn CatalogGateway>,
    connector: Arc<dyn RemoteConnector>,
    config: Arc<Z3950Config>,
}

impl Z3950Service {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        connector: Arc<dyn RemoteConnector>,
        config: Arc<Z3950Config>,
    ) -> Self {
        Self { gateway, connector, config }
    }

    pub fn server_for(&self, library: &str) -> Option<&RemoteServer> {
        self.config.server_for(library)
    }

    /// Holdings of `key` in the partner catalog `server`.
    ///
    /// Only relational failures (partner key translation, local link
    /// fallback) are returned as errors.
    pub async fn holdings(&self, server: &RemoteServer, key: &SearchKey) -> AppResult<RemoteHoldings> {
        let partner_keys = match key {
            SearchKey::Bib(bib_id) => {
                self.gateway
                    .partner_keys(*bib_id, &server.key_index_code, server.key_style)
                    .await?
            }
            _ => Vec::new(),
        };
        let local_bib = match key {
            SearchKey::Bib(bib_id) => Some(*bib_id),
            _ => None,
        };

        let query = match key {
            SearchKey::Bib(_) => search_key(&partner_keys, server.key_style)
                .map(|partner_key| SearchQuery::new(UseAttribute::LocalNumber, partner_key)),
            SearchKey::Isbn(isbn) => Some(SearchQuery::new(UseAttribute::Isbn, isbn.as_str())),
            SearchKey::Issn(issn) => Some(SearchQuery::new(UseAttribute::Issn, issn.as_str())),
            SearchKey::Oclc(oclc) => Some(SearchQuery::new(UseAttribute::StandardIdentifier, oclc.as_str())),
        };

        let outcome = match query {
            None => {
                tracing::debug!("No {} record key for {:?}", server.library, key);
                ScrapeOutcome::default()
            }
            Some(query) => match self.search(server, query).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("Z39.50 lookup on {} failed: {}", server.library, e);
                    return Ok(placeholder(server, partner_keys));
                }
            },
        };

        let outcome = if outcome.rows.is_empty() && outcome.last.link.is_empty() {
            match local_bib {
                Some(bib_id) => self.local_link_fallback(bib_id).await?,
                None => outcome,
            }
        } else {
            outcome
        };

        Ok(assemble(server, local_bib, partner_keys, outcome))
    }

    async fn search(
        &self,
        server: &RemoteServer,
        query: Result<SearchQuery, RemoteError>,
    ) -> Result<ScrapeOutcome, RemoteError> {
        let query = query?;
        let deadline = self.config.connect_timeout() + self.config.search_timeout();
        let dumps = tokio::time::timeout(deadline, self.connector.search(server, &query))
            .await
            .map_err(|_| RemoteError::Timeout {
                stage: "lookup",
                elapsed: deadline,
            })??;
        tracing::debug!("{} returned {} records for {}", server.library, dumps.len(), query.to_pqf());
        Ok(scraper_for(server.dialect).scrape(&server.library, &dumps))
    }

    /// An electronic-only row built from the local bib's own 856 link
    async fn local_link_fallback(&self, bib_id: i32) -> AppResult<ScrapeOutcome> {
        let Some(row) = self.gateway.bib_text(bib_id).await? else {
            return Ok(ScrapeOutcome::default());
        };
        let link = row.link.unwrap_or_default();
        if link.is_empty() {
            return Ok(ScrapeOutcome::default());
        }
        let message = row.message.unwrap_or_default();

        let record = RemoteRecord::electronic(after_marker(&link, "$u"), after_marker(&message, "$z"));
        Ok(ScrapeOutcome {
            rows: vec![record],
            last: RemoteRecord {
                status: NOT_CHARGED.to_string(),
                ..Default::default()
            },
            item_status: 1,
        })
    }
}

/// The partner key to search with
fn search_key(keys: &[String], style: PartnerKeyStyle) -> Option<&str> {
    match style {
        PartnerKeyStyle::Verbatim => keys.iter().find(|key| !key.contains(' ')),
        PartnerKeyStyle::CheckDigitStripped => keys.first(),
    }
    .map(String::as_str)
}

fn after_marker<'a>(value: &'a str, marker: &str) -> &'a str {
    match value.find(marker) {
        Some(idx) => &value[idx + marker.len()..],
        None => value,
    }
}

/// Hyperlink text pointing at the partner's record page
pub fn catalog_link(server: &RemoteServer, partner_keys: &[String]) -> String {
    match partner_keys.first() {
        Some(key) => format!(
            "Click on the following link to get the information about this item from {} <br>{}",
            server.catalog_name,
            server.record_url.replace("{key}", key)
        ),
        None => String::new(),
    }
}

/// Empty but well-formed bundle for an unreachable partner
pub fn placeholder(server: &RemoteServer, partner_keys: Vec<String>) -> RemoteHoldings {
    let availability = Availability {
        perm_location: catalog_link(server, &partner_keys),
        partner_keys,
        ..Default::default()
    };
    RemoteHoldings {
        availability,
        ..Default::default()
    }
}

/// Split scraped rows into links, holdings statements and items
fn classify(rows: Vec<RemoteRecord>, bib_id: Option<i32>) -> (MarcHoldingsBlock, Vec<Item>) {
    let mut mfhd = MarcHoldingsBlock::default();
    let mut items = Vec::new();

    for mut row in rows {
        if row.status == "MISSING" {
            row.status = "Missing".to_string();
        }

        if !row.link.is_empty() {
            mfhd.links.push(LinkEntry {
                linkage: String::new(),
                target: std::mem::take(&mut row.link),
                message: std::mem::take(&mut row.message),
            });
        }

        if !ITEM_STATUSES.contains(&row.status.as_str())
            && !row.status.contains("DUE")
            && !row.location.contains("INTERNET")
        {
            if !row.status.is_empty() {
                mfhd.statements.push(row.status);
            }
        } else {
            items.push(Item {
                bib_id,
                item_status_desc: row.status,
                perm_location: row.location,
                display_call_no: row.call_number,
                ..Default::default()
            });
        }
    }

    (mfhd, items)
}

fn assemble(
    server: &RemoteServer,
    bib_id: Option<i32>,
    partner_keys: Vec<String>,
    outcome: ScrapeOutcome,
) -> RemoteHoldings {
    let ScrapeOutcome { rows, last, item_status } = outcome;
    let (mut mfhd, items) = classify(rows, bib_id);
    mfhd.note = last.note;

    if !last.link.is_empty() && !mfhd.links.iter().any(|entry| entry.target == last.link) {
        mfhd.links.push(LinkEntry {
            linkage: String::new(),
            target: last.link.clone(),
            message: last.message.clone(),
        });
    }
    let link = if last.link.is_empty() {
        mfhd.links
            .last()
            .map(|entry| (entry.target.clone(), entry.message.clone()))
            .unwrap_or_default()
    } else {
        (last.link, last.message)
    };

    let electronic = ElectronicLink {
        link_852h: if link.0.is_empty() {
            String::new()
        } else {
            format!("{}: Electronic Resource", server.library)
        },
        link_856u: link.0,
        link_856z: link.1,
        ..Default::default()
    };

    let availability = Availability {
        bib_id,
        partner_keys,
        display_call_no: last.call_number,
        item_status,
        item_status_desc: last.status,
        perm_location: last.location,
        ..Default::default()
    };

    RemoteHoldings {
        availability,
        electronic,
        mfhd,
        items,
    }
}
