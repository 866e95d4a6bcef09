//! Data models for Launchpad

pub mod bib;
pub mod holding;
pub mod language;
pub mod remote_record;
pub mod rows;

// Re-export commonly used types
pub use bib::{
    BibliographicRecord, CjkInfo, RelatedBib, StandardNumberScheme, StandardNumberSet,
    StandardNumbers,
};
pub use holding::{Availability, ElectronicLink, Holding, Item, LinkEntry, MarcHoldingsBlock};
pub use remote_record::RemoteRecord;
