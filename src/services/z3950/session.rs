//! Z39.50 sessions against partner catalogs
//!
//! Uses the z3950-rs crate for Z39.50 protocol communication.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use z3950_rs::marc_rs::raw::RawField;
use z3950_rs::marc_rs::BinaryReader;
use z3950_rs::pdu::{AttributeElement, AttributeValue, AttributesPlusTerm, Operand, RpnQuery, RpnStructure, Term};
use z3950_rs::{bib1_attribute_set, Client, Query};

use crate::config::{RemoteServer, Z3950Config};
use crate::error::RemoteError;

/// Bib-1 use attributes understood by the partner catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseAttribute {
    LocalNumber,
    Isbn,
    Issn,
    StandardIdentifier,
}

impl UseAttribute {
    pub fn code(self) -> u32 {
        match self {
            UseAttribute::LocalNumber => 12,
            UseAttribute::Isbn => 7,
            UseAttribute::Issn => 8,
            UseAttribute::StandardIdentifier => 1007,
        }
    }
}

/// A single-term search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub attribute: UseAttribute,
    pub term: String,
}

impl SearchQuery {
    pub fn new(attribute: UseAttribute, term: impl Into<String>) -> Result<Self, RemoteError> {
        let term = term.into().trim().to_string();
        if term.is_empty() {
            return Err(RemoteError::Query(format!(
                "empty search term for use attribute {}",
                attribute.code()
            )));
        }
        Ok(Self { attribute, term })
    }

    /// Prefix notation, as in `@attr 1=12 b1234567`
    pub fn to_pqf(&self) -> String {
        format!("@attr 1={} {}", self.attribute.code(), self.term)
    }

    /// Type-1 query carrying the use attribute as a numeric bib-1 value
    pub fn to_rpn(&self) -> Result<Query, RemoteError> {
        let attribute_set = bib1_attribute_set().map_err(|e| RemoteError::Query(e.to_string()))?;
        let use_attribute = AttributeElement {
            attribute_set: None,
            attribute_type: 1.into(),
            attribute_value: AttributeValue::Numeric(i64::from(self.attribute.code()).into()),
        };

        Ok(Query::Type1(RpnQuery {
            attribute_set,
            rpn: RpnStructure::Op(Operand::AttributesPlusTerm(AttributesPlusTerm {
                attributes: vec![use_attribute],
                term: Term::General(self.term.as_bytes().into()),
            })),
        }))
    }
}

/// Transport to a partner catalog: one search, one dump per returned record
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn search(
        &self,
        server: &RemoteServer,
        query: &SearchQuery,
    ) -> Result<Vec<String>, RemoteError>;
}

/// Upper bound on records presented per search
const MAX_PRESENTED: usize = 50;

#[derive(Debug, Clone)]
pub struct Z3950Connector {
    connect_timeout: Duration,
    search_timeout: Duration,
}

impl Z3950Connector {
    pub fn new(config: &Z3950Config) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            search_timeout: config.search_timeout(),
        }
    }

    async fn fetch_records(
        client: &mut Client,
        server: &RemoteServer,
        query: &SearchQuery,
    ) -> Result<Vec<u8>, RemoteError> {
        let databases = [server.database.as_str()];

        let search_response = client
            .search(&databases, query.to_rpn()?)
            .await
            .map_err(|e| RemoteError::Search(e.to_string()))?;

        let hits = usize::try_from(&search_response.result_count)
            .unwrap_or_else(|_| search_response.result_count.to_string().parse::<usize>().unwrap_or(0));
        tracing::debug!("Z39.50 search returned {} hits on {}", hits, server.library);

        if hits == 0 {
            return Ok(Vec::new());
        }

        let count = std::cmp::min(hits, MAX_PRESENTED);
        client
            .present_raw(1, count as i64)
            .await
            .map_err(|e| RemoteError::Search(format!("present failed: {}", e)))
    }
}

/// First line of every MARC record dump
pub const MARC_DUMP_HEADER: &str = "Rec: USMARCnonstrict MARC:";

/// Text dumps of concatenated ISO 2709 records.
///
/// Each dump opens with [`MARC_DUMP_HEADER`], then one line per field:
/// `001 value` for control fields, `856 40 $zmessage $uhttp://...` for
/// data fields. Unreadable records are skipped and malformed trailing data
/// ends the walk.
pub fn record_dumps(raw: &[u8]) -> Vec<String> {
    let mut dumps = Vec::new();
    for record in BinaryReader::new(raw) {
        match record {
            Ok(view) => {
                let record = *view.as_raw();
                match record.fields() {
                    Ok(fields) => dumps.push(render_fields(&fields)),
                    Err(e) => tracing::warn!("Skipping unreadable MARC record: {}", e),
                }
            }
            Err(e) => {
                tracing::warn!("Stopping at malformed MARC data: {}", e);
                break;
            }
        }
    }
    dumps
}

fn render_fields(fields: &[RawField<'_>]) -> String {
    let mut lines = vec![MARC_DUMP_HEADER.to_string()];
    for field in fields {
        match field {
            RawField::Control { tag, data } => {
                lines.push(format!(
                    "{} {}",
                    String::from_utf8_lossy(tag),
                    String::from_utf8_lossy(data).trim_end_matches('\u{1e}').trim()
                ));
            }
            RawField::Data { tag, indicators, body } => {
                let subfields: Vec<String> = body
                    .split(|b| *b == 0x1F)
                    .skip(1)
                    .filter_map(|chunk| {
                        let (code, value) = chunk.split_first()?;
                        let value = String::from_utf8_lossy(value);
                        Some(format!("${}{}", *code as char, value.trim_end_matches('\u{1e}')))
                    })
                    .collect();
                lines.push(format!(
                    "{} {} {}",
                    String::from_utf8_lossy(tag),
                    String::from_utf8_lossy(indicators),
                    subfields.join(" ")
                ));
            }
        }
    }
    lines.join("\n")
}

#[async_trait]
impl RemoteConnector for Z3950Connector {
    async fn search(
        &self,
        server: &RemoteServer,
        query: &SearchQuery,
    ) -> Result<Vec<String>, RemoteError> {
        let addr = format!("{}:{}", server.address, server.port);
        tracing::info!(
            "Z39.50 search on {} ({}, {}): {}",
            server.library,
            addr,
            server.syntax.name(),
            query.to_pqf()
        );

        let mut client = timeout(self.connect_timeout, Client::connect(&addr))
            .await
            .map_err(|_| RemoteError::Timeout {
                stage: "connect",
                elapsed: self.connect_timeout,
            })?
            .map_err(|e| RemoteError::Connect {
                address: addr.clone(),
                message: e.to_string(),
            })?;

        let outcome = timeout(
            self.search_timeout,
            Self::fetch_records(&mut client, server, query),
        )
        .await;

        let _ = client.close().await;

        let records = outcome.map_err(|_| RemoteError::Timeout {
            stage: "search",
            elapsed: self.search_timeout,
        })??;

        let dumps = record_dumps(&records);
        tracing::info!("z3950-rs returned {} records from {}", dumps.len(), server.library);
        Ok(dumps)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Dialect, PartnerKeyStyle, RecordSyntax};
    use crate::services::z3950::dialect::scraper_for;

    /// A minimal ISO 2709 record holding `fields` as (tag, content) pairs.
    /// Data field content starts with its two indicators and uses `$` as
    /// the subfield delimiter.
    pub(crate) fn iso2709(fields: &[(&str, &str)]) -> Vec<u8> {
        let mut directory = Vec::new();
        let mut data = Vec::new();
        for (tag, content) in fields {
            let mut field: Vec<u8> = content.replace('$', "\u{1f}").into_bytes();
            field.push(0x1E);
            directory.extend(format!("{}{:04}{:05}", tag, field.len(), data.len()).into_bytes());
            data.extend(field);
        }
        directory.push(0x1E);

        let base = 24 + directory.len();
        let length = base + data.len() + 1;
        let mut record = format!("{:05}nam a22{:05} a 4500", length, base).into_bytes();
        record.extend(directory);
        record.extend(data);
        record.push(0x1D);
        record
    }

    fn rpn_use_attribute(query: &SearchQuery) -> (i64, i64, Vec<u8>) {
        let Query::Type1(rpn) = query.to_rpn().unwrap() else {
            panic!("expected a type-1 query");
        };
        let RpnStructure::Op(Operand::AttributesPlusTerm(operand)) = rpn.rpn else {
            panic!("expected a single term");
        };
        let element = &operand.attributes[0];
        let AttributeValue::Numeric(value) = &element.attribute_value;
        let Term::General(term) = &operand.term else {
            panic!("expected a general term");
        };
        (
            i64::try_from(&element.attribute_type).unwrap(),
            i64::try_from(value).unwrap(),
            term.to_vec(),
        )
    }

    #[test]
    fn test_query_rendering() {
        let query = SearchQuery::new(UseAttribute::LocalNumber, "b1234567").unwrap();
        assert_eq!(query.to_pqf(), "@attr 1=12 b1234567");

        let query = SearchQuery::new(UseAttribute::StandardIdentifier, " 12345678 ").unwrap();
        assert_eq!(query.to_pqf(), "@attr 1=1007 12345678");
    }

    #[test]
    fn test_wire_query_carries_numeric_use_attribute() {
        for (attribute, code) in [
            (UseAttribute::LocalNumber, 12),
            (UseAttribute::Isbn, 7),
            (UseAttribute::Issn, 8),
            (UseAttribute::StandardIdentifier, 1007),
        ] {
            let query = SearchQuery::new(attribute, "b1234567").unwrap();
            let (attribute_type, value, term) = rpn_use_attribute(&query);
            assert_eq!(attribute_type, 1);
            assert_eq!(value, code);
            assert_eq!(term, b"b1234567".to_vec());
        }
    }

    #[test]
    fn test_wire_query_keeps_quotes_in_term() {
        let query = SearchQuery::new(UseAttribute::Issn, "12\"34").unwrap();
        let (_, value, term) = rpn_use_attribute(&query);
        assert_eq!(value, 8);
        assert_eq!(term, b"12\"34".to_vec());
    }

    #[test]
    fn test_empty_term_is_rejected() {
        let err = SearchQuery::new(UseAttribute::Isbn, "  ").unwrap_err();
        assert!(matches!(err, RemoteError::Query(_)));
    }

    #[test]
    fn test_record_dump_renders_tagged_lines() {
        let raw = iso2709(&[
            ("001", "b1234567"),
            ("245", "00$aAn online title /$cA. Author."),
            ("856", "40$zOnline$uhttp://x.example/e"),
        ]);

        let dumps = record_dumps(&raw);
        assert_eq!(dumps.len(), 1);
        let lines: Vec<&str> = dumps[0].lines().collect();
        assert_eq!(lines[0], MARC_DUMP_HEADER);
        assert_eq!(lines[1], "001 b1234567");
        assert_eq!(lines[2], "245 00 $aAn online title / $cA. Author.");
        assert_eq!(lines[3], "856 40 $zOnline $uhttp://x.example/e");
    }

    #[test]
    fn test_record_dump_walks_every_record() {
        let mut raw = iso2709(&[("001", "b1")]);
        raw.extend(iso2709(&[("001", "b2")]));
        raw.extend(b"tail".to_vec());

        let dumps = record_dumps(&raw);
        assert_eq!(dumps.len(), 2);
        assert!(dumps[1].contains("001 b2"));
    }

    #[test]
    fn test_parsed_record_feeds_scrapers() {
        let raw = iso2709(&[
            ("001", "b1234567"),
            ("856", "40$zOnline$uhttp://x.example/e"),
        ]);
        let dumps = record_dumps(&raw);

        let millennium = scraper_for(Dialect::Millennium).scrape("GT", &dumps);
        assert_eq!(millennium.rows.len(), 1);
        assert_eq!(millennium.rows[0].link, "http://x.example/e");
        assert_eq!(millennium.rows[0].message.trim(), "Online");

        let voyager = scraper_for(Dialect::Voyager).scrape("GM", &dumps);
        assert!(voyager.rows.is_empty());
        assert_eq!(voyager.last.link, "http://x.example/e");
        assert_eq!(voyager.last.message, "Online");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_remote_error() {
        let config = Z3950Config {
            connect_timeout_ms: 200,
            search_timeout_ms: 200,
            servers: Vec::new(),
        };
        let server = RemoteServer {
            library: "GM".to_string(),
            address: "127.0.0.1".to_string(),
            port: 1,
            database: "VOYAGER".to_string(),
            syntax: RecordSyntax::Opac,
            dialect: Dialect::Voyager,
            key_index_code: "035A".to_string(),
            key_style: PartnerKeyStyle::Verbatim,
            catalog_name: "George Mason Catalog".to_string(),
            record_url: "http://catalog.example/{key}".to_string(),
        };
        let query = SearchQuery::new(UseAttribute::LocalNumber, "1").unwrap();

        let result = Z3950Connector::new(&config).search(&server, &query).await;
        assert!(matches!(
            result,
            Err(RemoteError::Connect { .. }) | Err(RemoteError::Timeout { .. })
        ));
    }
}
