//! Line scrapers for partner catalog record dumps
//!
//! Each partner system prints its holdings differently. A scraper walks the
//! dump of every returned record line by line and reconstructs holding rows.

use crate::config::Dialect;
use crate::models::RemoteRecord;

use super::session::MARC_DUMP_HEADER;

pub const NOT_CHARGED: &str = "Not Charged";
pub const CHARGED: &str = "Charged";

/// Rows scraped from one response, plus the state left after the last line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub rows: Vec<RemoteRecord>,
    /// Last status, location, call number, link and note seen
    pub last: RemoteRecord,
    pub item_status: i32,
}

pub trait RecordScraper: Send + Sync {
    fn scrape(&self, library: &str, dumps: &[String]) -> ScrapeOutcome;
}

pub fn scraper_for(dialect: Dialect) -> &'static dyn RecordScraper {
    match dialect {
        Dialect::Voyager => &VoyagerScraper,
        Dialect::Millennium => &MillenniumScraper,
    }
}

/// Text after the first colon of a line, skipping `skip` characters
/// counted from the colon itself
fn after_colon(line: &str, skip: usize) -> &str {
    let Some(idx) = line.find(':') else {
        return "";
    };
    let rest = &line[idx..];
    match rest.char_indices().nth(skip) {
        Some((offset, _)) => &rest[offset..],
        None => "",
    }
}

fn drop_last(value: &str) -> &str {
    let mut chars = value.chars();
    chars.next_back();
    chars.as_str()
}

/// Value up to an escaped line break, or without its closing quote
fn until_escape(value: &str) -> &str {
    match value.find('\\') {
        Some(end) => &value[..end],
        None => drop_last(value),
    }
}

/// Subfield value after `$<code>`, up to the first `stop` character
fn subfield_until<'a>(line: &'a str, code: char, stop: char) -> &'a str {
    let marker = format!("${}", code);
    let Some(start) = line.find(&marker) else {
        return "";
    };
    let value = &line[start + marker.len()..];
    match value.find(stop) {
        Some(end) => &value[..end],
        None => value,
    }
}

fn circulation_status(value: &str) -> Option<(&'static str, i32)> {
    if value == "True" || value == "AVAILABLE" {
        Some((NOT_CHARGED, 1))
    } else if value.starts_with("DUE") {
        Some((CHARGED, 0))
    } else {
        None
    }
}

/// Voyager OPAC dumps: one `localLocation` line opens each holding
pub struct VoyagerScraper;

impl RecordScraper for VoyagerScraper {
    fn scrape(&self, library: &str, dumps: &[String]) -> ScrapeOutcome {
        let mut outcome = ScrapeOutcome::default();
        let mut current = RemoteRecord::default();
        let mut last_link = None;

        for dump in dumps {
            let mut holding_found = false;
            current = RemoteRecord::default();

            for line in dump.lines() {
                if line.contains("856 4") {
                    current.link = subfield_until(line, 'u', ' ').trim().to_string();
                    current.message = subfield_until(line, 'z', '$').trim().to_string();
                    current.location = format!("{}: online", library);
                    current.status = NOT_CHARGED.to_string();
                    outcome.item_status = 1;
                    last_link = Some((current.link.clone(), current.message.clone()));
                } else if line.contains("852") && line.contains("$o") {
                    current.note = subfield_until(line, 'o', '$').trim().to_string();
                } else if line.contains("availableNow") {
                    let value = after_colon(line, 2).trim_matches(|c| c == ' ' || c == '\'');
                    let (status, code) = circulation_status(value).unwrap_or((CHARGED, 0));
                    current.status = status.to_string();
                    outcome.item_status = code;
                } else if line.contains("callNumber") {
                    current.call_number = until_escape(after_colon(line, 3)).to_string();
                } else if line.contains("localLocation") {
                    if holding_found {
                        outcome.rows.push(current.clone());
                        current.call_number.clear();
                        current.status.clear();
                    }
                    // the 856 link belongs to the record, not to its holdings
                    current.link.clear();
                    current.message.clear();
                    let location = until_escape(after_colon(line, 3))
                        .trim_matches(|c| c == ' ' || c == '-' || c == '.');
                    current.location = format!("{}: {}", library, location);
                    holding_found = true;
                }
            }

            if holding_found {
                outcome.rows.push(current.clone());
            }
        }

        outcome.last = current;
        if let Some((link, message)) = last_link {
            outcome.last.link = link;
            outcome.last.message = message;
        }
        outcome
    }
}

/// Millennium OPAC dumps: a `callNumber` line closes each holding
pub struct MillenniumScraper;

impl MillenniumScraper {
    /// 856 link of a MARC-only dump: the `$u` value, and the text between
    /// `$z` and `$u` as its message
    fn marc_link(dump: &str) -> Option<(String, String)> {
        let line = dump.lines().find(|line| line.contains("856 40"))?;
        let url = line
            .find("$u")
            .map(|start| {
                let value = &line[start + 2..];
                match value.find(" $") {
                    Some(end) => value[..end].to_string(),
                    None => value.to_string(),
                }
            })
            .unwrap_or_default();
        let message = line
            .find("$z")
            .map(|start| {
                let value = &line[start + 2..];
                match value.find("$u") {
                    Some(end) => value[..end].to_string(),
                    None => value.to_string(),
                }
            })
            .unwrap_or_default();
        Some((url, message))
    }
}

impl RecordScraper for MillenniumScraper {
    fn scrape(&self, library: &str, dumps: &[String]) -> ScrapeOutcome {
        let mut outcome = ScrapeOutcome::default();
        let mut current = RemoteRecord::default();

        for dump in dumps {
            current = RemoteRecord::default();

            let marc_only = dump
                .lines()
                .next()
                .map(|first| first.contains(MARC_DUMP_HEADER))
                .unwrap_or(false);
            if marc_only {
                if let Some((url, message)) = Self::marc_link(dump) {
                    current.link = url;
                    current.message = message;
                    outcome.rows.push(current.clone());
                }
                continue;
            }

            for line in dump.lines() {
                if line.contains("Holdings") {
                    continue;
                }
                if line.contains("localLocation") {
                    let location = drop_last(after_colon(line, 3))
                        .trim_matches(|c| c == ' ' || c == '.' || c == '-');
                    current.location = format!("{}: {}", library, location);
                } else if line.contains("publicNote") {
                    current.status = after_colon(line, 2)
                        .trim_matches(|c| c == ' ' || c == '\'')
                        .to_string();
                    if let Some((status, code)) = circulation_status(&current.status) {
                        current.status = status.to_string();
                        outcome.item_status = code;
                    }
                } else if line.contains("callNumber") {
                    current.call_number = drop_last(after_colon(line, 3)).to_string();
                    outcome.rows.push(current.clone());
                }
            }
        }

        outcome.last = current;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(lines: &[&str]) -> String {
        lines.join("\n")
    }

    #[test]
    fn test_after_colon() {
        assert_eq!(after_colon("callNumber: 'QA76'", 3), "QA76'");
        assert_eq!(after_colon("availableNow: True", 2), "True");
        assert_eq!(after_colon("no colon here", 2), "");
        assert_eq!(after_colon("short:", 3), "");
    }

    #[test]
    fn test_voyager_holdings() {
        let record = dump(&[
            "bibliographicRecord: ...",
            "holdingsData:",
            "    localLocation: 'Fenwick Stacks -\\n'",
            "    callNumber: 'QA76.73 .R87 2020\\n'",
            "    availableNow: True",
            "    localLocation: 'Johnson Center.\\n'",
            "    callNumber: 'QA76.73 .R87 2020 c.2\\n'",
            "    availableNow: False",
        ]);
        let outcome = VoyagerScraper.scrape("GM", &[record]);

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].location, "GM: Fenwick Stacks");
        assert_eq!(outcome.rows[0].call_number, "QA76.73 .R87 2020");
        assert_eq!(outcome.rows[0].status, NOT_CHARGED);
        assert_eq!(outcome.rows[1].location, "GM: Johnson Center");
        assert_eq!(outcome.rows[1].status, CHARGED);
        assert_eq!(outcome.item_status, 0);
        assert_eq!(outcome.last.call_number, "QA76.73 .R87 2020 c.2");
    }

    #[test]
    fn test_voyager_link_without_location_is_not_a_holding() {
        let record = dump(&[
            "856 4 $uhttp://proxy.example/record/1 extra$zConnect to resource$3v.1",
        ]);
        let outcome = VoyagerScraper.scrape("GM", &[record]);

        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.last.link, "http://proxy.example/record/1");
        assert_eq!(outcome.last.message, "Connect to resource");
        assert_eq!(outcome.last.location, "GM: online");
        assert_eq!(outcome.item_status, 1);
    }

    #[test]
    fn test_voyager_link_does_not_leak_into_holdings() {
        let record = dump(&[
            "856 40 $uhttp://proxy.example/e $zOnline",
            "holdingsData:",
            "    localLocation: 'Fenwick Stacks\\n'",
            "    callNumber: 'QA76 .R8\\n'",
            "    availableNow: True",
            "    localLocation: 'Johnson Center\\n'",
            "    callNumber: 'QA76 .R8 c.2\\n'",
            "    availableNow: False",
        ]);
        let outcome = VoyagerScraper.scrape("GM", &[record]);

        assert_eq!(outcome.rows.len(), 2);
        assert!(outcome.rows.iter().all(|row| row.link.is_empty()));
        assert_eq!(outcome.rows[0].location, "GM: Fenwick Stacks");
        assert_eq!(outcome.rows[0].status, NOT_CHARGED);
        assert_eq!(outcome.rows[1].status, CHARGED);
        assert_eq!(outcome.last.link, "http://proxy.example/e");
        assert_eq!(outcome.last.message, "Online");
        assert_eq!(outcome.last.location, "GM: Johnson Center");
    }

    #[test]
    fn test_voyager_note() {
        let record = dump(&[
            "852 0 $bmain$oBound with v.2$yx",
            "    localLocation: 'Stacks\\n'",
        ]);
        let outcome = VoyagerScraper.scrape("GM", &[record]);
        assert_eq!(outcome.rows[0].note, "Bound with v.2");
    }

    #[test]
    fn test_millennium_holdings() {
        let record = dump(&[
            "Holdings: 2",
            "    localLocation: 'Lauinger Stacks.'",
            "    publicNote: 'AVAILABLE'",
            "    callNumber: 'PS3545 .I345'",
            "    localLocation: 'Woodstock -'",
            "    publicNote: 'DUE 10-20-26'",
            "    callNumber: 'PS3545 .I345 c.2'",
        ]);
        let outcome = MillenniumScraper.scrape("GT", &[record]);

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].location, "GT: Lauinger Stacks");
        assert_eq!(outcome.rows[0].status, NOT_CHARGED);
        assert_eq!(outcome.rows[0].call_number, "PS3545 .I345");
        assert_eq!(outcome.rows[1].location, "GT: Woodstock");
        assert_eq!(outcome.rows[1].status, CHARGED);
        assert_eq!(outcome.item_status, 0);
    }

    #[test]
    fn test_millennium_keeps_unknown_status() {
        let record = dump(&[
            "    localLocation: 'Reference.'",
            "    publicNote: 'LIB USE ONLY'",
            "    callNumber: 'Z1000 .A1'",
        ]);
        let outcome = MillenniumScraper.scrape("DA", &[record]);
        assert_eq!(outcome.rows[0].status, "LIB USE ONLY");
    }

    #[test]
    fn test_millennium_marc_only_link() {
        let record = dump(&[
            "Rec: USMARCnonstrict MARC:",
            "245 00 $aAn online title",
            "856 40 $zFull text available $uhttp://ezproxy.example/login?url=x",
        ]);
        let outcome = MillenniumScraper.scrape("GT", &[record]);

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].link, "http://ezproxy.example/login?url=x");
        assert_eq!(outcome.rows[0].message, "Full text available ");
    }

    #[test]
    fn test_empty_response_has_no_rows() {
        for dialect in [Dialect::Voyager, Dialect::Millennium] {
            let outcome = scraper_for(dialect).scrape("GT", &[]);
            assert!(outcome.rows.is_empty());
            assert_eq!(outcome.last, RemoteRecord::default());
        }
    }
}
