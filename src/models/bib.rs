//! Bibliographic record model and standard-number sets

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::holding::Holding;
use super::rows::BibTextRow;

/// Standard number family used for cross-referencing bibs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StandardNumberScheme {
    Isbn,
    Issn,
    Oclc,
}

impl StandardNumberScheme {
    pub const ALL: [StandardNumberScheme; 3] = [
        StandardNumberScheme::Isbn,
        StandardNumberScheme::Issn,
        StandardNumberScheme::Oclc,
    ];
}

impl std::fmt::Display for StandardNumberScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StandardNumberScheme::Isbn => "isbn",
            StandardNumberScheme::Issn => "issn",
            StandardNumberScheme::Oclc => "oclc",
        };
        write!(f, "{}", label)
    }
}

/// Normalized and display forms collected for one scheme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StandardNumberSet {
    pub normalized: Vec<String>,
    pub display: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StandardNumbers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<StandardNumberSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issn: Option<StandardNumberSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oclc: Option<StandardNumberSet>,
}

impl StandardNumbers {
    pub fn set(&mut self, scheme: StandardNumberScheme, numbers: StandardNumberSet) {
        let slot = match scheme {
            StandardNumberScheme::Isbn => &mut self.isbn,
            StandardNumberScheme::Issn => &mut self.issn,
            StandardNumberScheme::Oclc => &mut self.oclc,
        };
        *slot = Some(numbers);
    }
}

/// Parallel East-Asian script fields decoded from the 880 block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CjkInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author600: Option<String>,
}

impl CjkInfo {
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.title.is_none() && self.imprint.is_none() && self.author600.is_none()
    }
}

/// Another local bib describing the same work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RelatedBib {
    pub bib_id: i32,
    pub library_name: String,
}

/// Aggregated bibliographic description of one bib id
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BibliographicRecord {
    pub bib_id: i32,
    pub title: String,
    pub author: String,
    pub edition: String,
    pub isbn: String,
    pub issn: String,
    /// Network number, kept only when it carries an OCLC marker
    pub oclc: String,
    pub publisher: String,
    pub pub_place: String,
    pub imprint: String,
    pub bib_format: String,
    pub language: String,
    pub language_display: String,
    pub library_name: String,
    pub publisher_date: String,
    /// First 856 `$u` of the bib record
    pub link: String,
    /// First 856 `$z` of the bib record
    pub message: String,
    /// Main entry followed by added entries
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cjk_info: Option<CjkInfo>,
    pub standard_numbers: StandardNumbers,
    /// This bib first, then every bib sharing a standard number
    pub related_bibs: Vec<RelatedBib>,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

impl BibliographicRecord {
    pub fn related_bib_ids(&self) -> Vec<i32> {
        self.related_bibs.iter().map(|b| b.bib_id).collect()
    }

    /// Raw value stored on the record for a scheme
    pub fn standard_number(&self, scheme: StandardNumberScheme) -> &str {
        match scheme {
            StandardNumberScheme::Isbn => &self.isbn,
            StandardNumberScheme::Issn => &self.issn,
            StandardNumberScheme::Oclc => &self.oclc,
        }
    }
}

impl From<BibTextRow> for BibliographicRecord {
    fn from(row: BibTextRow) -> Self {
        Self {
            bib_id: row.bib_id,
            title: row.title.unwrap_or_default(),
            author: row.author.unwrap_or_default(),
            edition: row.edition.unwrap_or_default(),
            isbn: row.isbn.unwrap_or_default(),
            issn: row.issn.unwrap_or_default(),
            oclc: row.oclc.unwrap_or_default(),
            publisher: row.publisher.unwrap_or_default(),
            pub_place: row.pub_place.unwrap_or_default(),
            imprint: row.imprint.unwrap_or_default(),
            bib_format: row.bib_format.unwrap_or_default(),
            language: row.language.unwrap_or_default(),
            language_display: String::new(),
            library_name: row.library_name,
            publisher_date: row.publisher_date.unwrap_or_default(),
            link: row.link.unwrap_or_default(),
            message: row.message.unwrap_or_default(),
            authors: Vec::new(),
            cjk_info: None,
            standard_numbers: StandardNumbers::default(),
            related_bibs: Vec::new(),
            holdings: Vec::new(),
        }
    }
}
