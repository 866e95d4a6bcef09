//! Normalized record scraped from a partner catalog response

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One holding line reconstructed from a Z39.50 record dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RemoteRecord {
    pub status: String,
    pub location: String,
    pub call_number: String,
    pub link: String,
    pub message: String,
    pub note: String,
}

impl RemoteRecord {
    /// A record carrying only an electronic link
    pub fn electronic(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}
