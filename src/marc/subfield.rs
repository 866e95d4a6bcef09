//! Subfield text parser
//!
//! Parsing is total: malformed text yields empty values, never an error.

use crate::models::rows::MfhdTextRow;
use crate::models::{LinkEntry, MarcHoldingsBlock};

/// Separator between repeated occurrences of a field
pub const FIELD_DELIMITER: &str = " // ";
/// Looser separator used between 866 lines
pub const LINE_DELIMITER: &str = "//";
pub const SUBFIELD_MARKER: char = '$';

/// A MARC subfield
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub data: String,
}

/// One occurrence of a field, as a list of subfields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOccurrence {
    pub subfields: Vec<Subfield>,
}

impl FieldOccurrence {
    /// Parse `"$aFoo$bBar"`; anything before the first `$` is ignored
    pub fn parse(text: &str) -> Self {
        let subfields = text
            .split(SUBFIELD_MARKER)
            .skip(1)
            .filter_map(|part| {
                let mut chars = part.chars();
                let code = chars.next()?;
                Some(Subfield {
                    code,
                    data: chars.as_str().to_string(),
                })
            })
            .collect();
        Self { subfields }
    }

    /// First value for a subfield code
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.data.as_str())
    }

    /// Last value for a subfield code
    pub fn last_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .rev()
            .find(|sf| sf.code == code)
            .map(|sf| sf.data.as_str())
    }
}

/// Split a field block into its occurrences
pub fn parse_fields(block: &str) -> Vec<FieldOccurrence> {
    if block.is_empty() {
        return Vec::new();
    }
    block.split(FIELD_DELIMITER).map(FieldOccurrence::parse).collect()
}

/// 856 block: one link entry per field occurrence
pub fn parse_links(block: &str) -> Vec<LinkEntry> {
    parse_fields(block)
        .iter()
        .map(|field| LinkEntry {
            linkage: field.last_subfield('3').unwrap_or_default().to_string(),
            target: field.last_subfield('u').unwrap_or_default().to_string(),
            message: field.last_subfield('z').unwrap_or_default().to_string(),
        })
        .collect()
}

/// 852 block: the last `$z` anywhere in the block
pub fn parse_note(block: &str) -> String {
    FieldOccurrence::parse(block)
        .last_subfield('z')
        .unwrap_or_default()
        .to_string()
}

/// 866 block: the first `$a` of every line, without surrounding quotes
pub fn parse_statements(block: &str) -> Vec<String> {
    if block.is_empty() {
        return Vec::new();
    }
    block
        .split(LINE_DELIMITER)
        .filter_map(|line| {
            FieldOccurrence::parse(line)
                .get_subfield('a')
                .map(|value| value.trim_matches(|c| c == ' ' || c == '\'').to_string())
        })
        .collect()
}

/// Parse the three MFHD tag blocks of one holding record
pub fn parse_holdings_block(row: &MfhdTextRow) -> MarcHoldingsBlock {
    MarcHoldingsBlock {
        note: row.marc852.as_deref().map(parse_note).unwrap_or_default(),
        links: row.marc856.as_deref().map(parse_links).unwrap_or_default(),
        statements: row.marc866.as_deref().map(parse_statements).unwrap_or_default(),
    }
}

/// "Library has" lines from raw 866 text: the `$a` value of each line, or
/// the text after the last subfield marker, or the line itself.
pub fn library_has(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(LINE_DELIMITER)
        .map(|line| {
            if let Some(start) = line.find("$a") {
                let value = &line[start + 2..];
                return match value.find(SUBFIELD_MARKER) {
                    Some(end) => value[..end].to_string(),
                    None => value.to_string(),
                };
            }
            match line.rfind(SUBFIELD_MARKER) {
                Some(idx) => {
                    let mut rest = line[idx + 1..].chars();
                    rest.next();
                    rest.as_str().to_string()
                }
                None => line.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_block_round_trip() {
        let links = parse_links("41$3Full text$uhttp://example.org/a$zAccess online");
        assert_eq!(
            links,
            vec![LinkEntry {
                linkage: "Full text".to_string(),
                target: "http://example.org/a".to_string(),
                message: "Access online".to_string(),
            }]
        );
    }

    #[test]
    fn test_links_one_entry_per_occurrence() {
        let links = parse_links("40$uhttp://a.example$zFirst // 41$uhttp://b.example");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].message, "First");
        assert_eq!(links[1].target, "http://b.example");
        assert_eq!(links[1].message, "");
        assert_eq!(links[1].linkage, "");
    }

    #[test]
    fn test_parsing_is_total() {
        for text in ["", "no markers at all", "$", "$$$", "// //", " // $", "$é"] {
            let _ = parse_links(text);
            let _ = parse_statements(text);
            let _ = library_has(text);
            let _ = parse_note(text);
        }
        assert_eq!(parse_note("plain text"), "");
        assert_eq!(parse_links("plain text"), vec![LinkEntry::default()]);
        assert!(parse_links("").is_empty());
    }

    #[test]
    fn test_unknown_tags_are_ignored() {
        let links = parse_links("$qignored$uhttp://x.example");
        assert_eq!(links[0].target, "http://x.example");
        assert_eq!(links[0].message, "");
    }

    #[test]
    fn test_note_keeps_last_z() {
        assert_eq!(parse_note("0 $bGW$zFirst note$hQA1 // $zSecond note"), "Second note");
    }

    #[test]
    fn test_statements() {
        let statements = parse_statements("40$8 0$a v.1-10 (1990-1999)//41$a'v.11-'$zcurrent");
        assert_eq!(statements, vec!["v.1-10 (1990-1999)", "v.11-"]);
    }

    #[test]
    fn test_holdings_block_from_row() {
        let row = MfhdTextRow {
            marc852: Some("$bstacks$zAsk at desk".to_string()),
            marc856: None,
            marc866: Some("$av.1-5".to_string()),
        };
        let block = parse_holdings_block(&row);
        assert_eq!(block.note, "Ask at desk");
        assert!(block.links.is_empty());
        assert_eq!(block.statements, vec!["v.1-5"]);
    }

    #[test]
    fn test_library_has() {
        assert_eq!(
            library_has("$8 1$av.1-20$zlacks v.3//$8 2$zindex only//1995-2000"),
            vec!["v.1-20", "index only", "1995-2000"]
        );
        assert!(library_has("").is_empty());
    }
}
