//! MARC subfield text decoding
//!
//! The catalog exposes MARC tags as flat strings: repeated field occurrences
//! joined by `" // "`, subfields introduced by `$` and a one-character code.
//! This module turns those strings back into structured holdings data.

pub mod cjk;
pub mod subfield;

pub use cjk::decode_cjk;
pub use subfield::{
    library_has, parse_fields, parse_holdings_block, parse_links, parse_note, parse_statements,
    FieldOccurrence, Subfield,
};
