//! Standard number normalization (ISBN, ISSN, OCLC)
//!
//! All normalizers are total: an unusable value comes back as an empty string.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::StandardNumberScheme;

static OCLC_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"OCoLC|oc[mn]").expect("valid OCLC marker pattern"));

const ISBN_MIN_LEN: usize = 10;
const ISSN_MIN_LEN: usize = 9;
const OCLC_MIN_LEN: usize = 8;

/// Normalize an ISBN: drop any trailing qualifier after the first space and
/// strip `-:.;` separators.
pub fn normalize_isbn(raw: &str) -> String {
    let isbn = raw.trim().split(' ').next().unwrap_or_default();
    if isbn.chars().count() < ISBN_MIN_LEN {
        return String::new();
    }
    let cleaned: String = isbn.chars().filter(|c| !"-:.;".contains(*c)).collect();
    if cleaned.chars().count() < ISBN_MIN_LEN {
        return String::new();
    }
    cleaned
}

/// Normalize an ISSN to its hyphenated form
pub fn normalize_issn(raw: &str) -> String {
    if raw.chars().count() < ISSN_MIN_LEN {
        return String::new();
    }
    raw.trim().replace(' ', "-")
}

/// Normalize an OCLC number to its digits
pub fn normalize_oclc(raw: &str) -> String {
    if raw.chars().count() < OCLC_MIN_LEN {
        return String::new();
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < OCLC_MIN_LEN {
        return String::new();
    }
    digits
}

/// True when the text carries an OCLC source marker (`OCoLC`, `ocm`, `ocn`)
pub fn is_oclc_tagged(text: &str) -> bool {
    OCLC_MARKER.is_match(text)
}

/// Form of a raw number as stored in the inverted index `normal_heading` column
pub fn index_form(scheme: StandardNumberScheme, raw: &str) -> String {
    match scheme {
        StandardNumberScheme::Isbn => normalize_isbn(raw),
        StandardNumberScheme::Issn => raw.trim().replace('-', " "),
        StandardNumberScheme::Oclc => normalize_oclc(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_isbn_strips_qualifier_and_separators() {
        assert_eq!(normalize_isbn("0-123-45678-9 (paperback)"), "0123456789");
        assert_eq!(normalize_isbn("  978-2-07-040850-4  "), "9782070408504");
        assert_eq!(normalize_isbn("0:123;45.678-X"), "012345678X");
    }

    #[test]
    fn test_normalize_isbn_rejects_short_values() {
        assert_eq!(normalize_isbn("012345678"), "");
        assert_eq!(normalize_isbn("12345 6789012"), "");
        assert_eq!(normalize_isbn(""), "");
        assert_eq!(normalize_isbn("0-12-3456-7"), "");
    }

    #[test]
    fn test_normalizers_are_idempotent() {
        for raw in [
            "0-123-45678-9 (paperback)",
            "9782070408504",
            "0-12-3456-7",
            "junk",
            "",
        ] {
            let once = normalize_isbn(raw);
            assert_eq!(normalize_isbn(&once), once, "isbn {raw:?}");
        }
        for raw in ["1234 5678", "1234-5678", "12345", ""] {
            let once = normalize_issn(raw);
            assert_eq!(normalize_issn(&once), once, "issn {raw:?}");
        }
        for raw in ["(OCoLC)ocm12345678", "(OCoLC)123", "ocn987654321", ""] {
            let once = normalize_oclc(raw);
            assert_eq!(normalize_oclc(&once), once, "oclc {raw:?}");
        }
    }

    #[test]
    fn test_normalize_issn() {
        assert_eq!(normalize_issn("1234 5678"), "1234-5678");
        assert_eq!(normalize_issn("1234-567"), "");
    }

    #[test]
    fn test_normalize_oclc() {
        assert_eq!(normalize_oclc("(OCoLC)ocm12345678"), "12345678");
        assert_eq!(normalize_oclc("ocm1234"), "");
        assert_eq!(normalize_oclc("(OCoLC)1234"), "");
    }

    #[test]
    fn test_is_oclc_tagged() {
        assert!(is_oclc_tagged("(OCoLC)12345678"));
        assert!(is_oclc_tagged("ocm12345678"));
        assert!(is_oclc_tagged("ocn123456789"));
        assert!(!is_oclc_tagged("(DLC)12345678"));
        assert!(!is_oclc_tagged("OCLC 12345678"));
        assert!(!is_oclc_tagged(""));
    }

    #[test]
    fn test_index_form() {
        assert_eq!(index_form(StandardNumberScheme::Issn, "1234-5678"), "1234 5678");
        assert_eq!(index_form(StandardNumberScheme::Isbn, "0-123-45678-9"), "0123456789");
        assert_eq!(index_form(StandardNumberScheme::Oclc, "(OCoLC)ocm12345678"), "12345678");
    }
}
