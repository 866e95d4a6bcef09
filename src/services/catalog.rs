//! Bibliographic and holdings aggregation service

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    identifiers::{index_form, is_oclc_tagged},
    marc::{decode_cjk, library_has, parse_holdings_block},
    models::{
        holding::trim_location_prefix, language::language_name, Availability, BibliographicRecord,
        Holding, Item, RelatedBib, StandardNumberScheme, StandardNumberSet,
    },
    repository::CatalogGateway,
    services::{
        eligibility, illiad,
        z3950::{RemoteHoldings, SearchKey, Z3950Service},
    },
};

#[derive(Clone)]
pub struct CatalogService {
    gateway: Arc<dyn CatalogGateway>,
    remote: Z3950Service,
    config: Arc<CatalogConfig>,
}

impl CatalogService {
    pub fn new(gateway: Arc<dyn CatalogGateway>, remote: Z3950Service, config: Arc<CatalogConfig>) -> Self {
        Self { gateway, remote, config }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.gateway.ping().await
    }

    /// Bibliographic record of `bib_id` with its related bibs, or `None` if the
    /// bib is absent, suppressed or has no owning library
    pub async fn get_bibliographic_data(&self, bib_id: i32) -> AppResult<Option<BibliographicRecord>> {
        let Some(mut row) = self.gateway.bib_text(bib_id).await? else {
            return Ok(None);
        };
        let cjk_text = row.cjk_info.take();
        let mut bib = BibliographicRecord::from(row);

        if !bib.oclc.is_empty() && !is_oclc_tagged(&bib.oclc) {
            tracing::debug!("Dropping network number {} of bib {}", bib.oclc, bib_id);
            bib.oclc.clear();
        }

        bib.authors = self.authors(&bib).await?;

        if let Some(text) = cjk_text.filter(|text| !text.is_empty()) {
            let cjk = decode_cjk(&text);
            if !cjk.is_empty() {
                bib.cjk_info = Some(cjk);
            }
        }

        bib.language_display = language_name(&bib.language).unwrap_or_default().to_string();

        let mut related: IndexMap<i32, RelatedBib> = IndexMap::new();
        related.insert(
            bib.bib_id,
            RelatedBib {
                bib_id: bib.bib_id,
                library_name: bib.library_name.clone(),
            },
        );

        for scheme in StandardNumberScheme::ALL {
            if bib.standard_number(scheme).is_empty() {
                continue;
            }
            let Some(numbers) = self.standard_number_set(bib_id, scheme).await? else {
                continue;
            };

            let rows = self.gateway.related_bibs(scheme, &numbers.normalized).await?;
            for row in rows {
                if scheme == StandardNumberScheme::Oclc && !is_oclc_tagged(&row.display_heading) {
                    continue;
                }
                related.entry(row.bib_id).or_insert(RelatedBib {
                    bib_id: row.bib_id,
                    library_name: row.library_name,
                });
            }
            bib.standard_numbers.set(scheme, numbers);
        }

        bib.related_bibs = related.into_values().collect();
        tracing::debug!("Bib {} has {} related bibs", bib_id, bib.related_bibs.len());
        Ok(Some(bib))
    }

    /// Main entry first, then added entries, without trailing periods
    async fn authors(&self, bib: &BibliographicRecord) -> AppResult<Vec<String>> {
        let added = self.gateway.added_authors(bib.bib_id).await?;
        let authors = std::iter::once(bib.author.clone())
            .chain(added)
            .map(|author| {
                let author = author.trim();
                author.strip_suffix('.').unwrap_or(author).to_string()
            })
            .filter(|author| !author.is_empty())
            .collect();
        Ok(authors)
    }

    async fn standard_number_set(
        &self,
        bib_id: i32,
        scheme: StandardNumberScheme,
    ) -> AppResult<Option<StandardNumberSet>> {
        let rows = self.gateway.standard_numbers(bib_id, scheme).await?;
        let rows: Vec<_> = rows
            .into_iter()
            .filter(|row| scheme != StandardNumberScheme::Oclc || is_oclc_tagged(&row.display_heading))
            .collect();
        if rows.is_empty() {
            return Ok(None);
        }

        let normalized: BTreeSet<String> = rows.iter().map(|row| row.normal_heading.clone()).collect();
        let display: BTreeSet<String> = rows
            .iter()
            .map(|row| row.display_heading.trim().to_string())
            .collect();

        Ok(Some(StandardNumberSet {
            normalized: normalized.into_iter().collect(),
            display: display.into_iter().collect(),
        }))
    }

    /// Holdings of every related bib, annotated and sorted by library name
    pub async fn get_holdings(&self, bib: &BibliographicRecord) -> AppResult<Vec<Holding>> {
        let bib_ids = bib.related_bib_ids();
        let rows = self.gateway.holdings(&bib_ids).await?;

        let mut queried: HashSet<i32> = HashSet::new();
        let mut holdings = Vec::with_capacity(rows.len());

        for row in rows {
            let mut holding = Holding::from(row);

            if let Some(server) = self.remote.server_for(&holding.library_name) {
                if !queried.insert(holding.bib_id) {
                    tracing::debug!("Skipping repeated {} lookup for bib {}", holding.library_name, holding.bib_id);
                    continue;
                }
                let bundle = self.remote.holdings(server, &SearchKey::Bib(holding.bib_id)).await?;
                apply_remote(&mut holding, bundle);
                if holding.remove {
                    continue;
                }
            } else {
                self.load_local(&mut holding).await?;
            }

            self.annotate(&mut holding);
            holdings.push(holding);
        }

        holdings.sort_by(|a, b| a.library_full_name.cmp(&b.library_full_name));
        Ok(holdings)
    }

    async fn load_local(&self, holding: &mut Holding) -> AppResult<()> {
        let mfhd_id = holding.mfhd_id;

        holding.electronic = self.gateway.electronic_data(mfhd_id).await?.map(Into::into);

        let items = self.gateway.items(mfhd_id).await?;
        holding.availability = items.first().map(Availability::from);
        holding.items = items.into_iter().map(Item::from).collect();

        holding.mfhd = self
            .gateway
            .mfhd_text(mfhd_id)
            .await?
            .map(|row| parse_holdings_block(&row))
            .unwrap_or_default();
        Ok(())
    }

    fn annotate(&self, holding: &mut Holding) {
        let full_name = self.config.library_full_name(&holding.library_name);

        for item in holding.items.iter_mut() {
            item.eligible = eligibility::item_eligible(&self.config, item, &holding.library_name);
            item.library_full_name = full_name.clone();
            item.trimmed_location_display_name = trim_location_prefix(&item.perm_location);
        }

        holding.eligible = eligibility::holding_eligible(&self.config, holding);
        holding.library_has = holding
            .electronic
            .as_ref()
            .and_then(|electronic| electronic.link_866.as_deref())
            .map(library_has)
            .unwrap_or_default();
        holding.trimmed_location_display_name = trim_location_prefix(&holding.location_display_name);
        holding.library_full_name = full_name;
    }

    /// Bibliographic record with holdings attached
    pub async fn get_item(&self, bib_id: i32) -> AppResult<BibliographicRecord> {
        let mut bib = self
            .get_bibliographic_data(bib_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Bib {} not found", bib_id)))?;
        bib.holdings = self.get_holdings(&bib).await?;
        Ok(bib)
    }

    /// The bib to show for a standard number: the preferred library's copy if
    /// there is one, otherwise the first match
    pub async fn primary_bib_id(&self, scheme: StandardNumberScheme, raw: &str) -> AppResult<Option<i32>> {
        let normalized = index_form(scheme, raw);
        if normalized.is_empty() {
            return Ok(None);
        }
        let rows = self.gateway.bibs_by_number(scheme, &normalized).await?;
        let preferred = rows
            .iter()
            .find(|row| row.library_name == self.config.preferred_library)
            .or_else(|| rows.first());
        Ok(preferred.map(|row| row.bib_id))
    }

    /// Local bib recorded under a partner catalog's record key
    pub async fn bib_id_for_partner_key(&self, library: &str, key: &str) -> AppResult<Option<i32>> {
        let server = self
            .remote
            .server_for(library)
            .ok_or_else(|| AppError::BadRequest(format!("{} has no partner catalog", library)))?;
        self.gateway
            .bib_for_partner_key(key, &server.key_index_code, server.key_style)
            .await
    }

    pub fn document_request_url(&self, bib: &BibliographicRecord) -> String {
        illiad::document_request_url(&self.config.illiad, bib)
    }
}

/// Merge a partner-catalog bundle into its holding, flagging it for removal
/// when nothing usable came back
fn apply_remote(holding: &mut Holding, bundle: RemoteHoldings) {
    let RemoteHoldings {
        availability,
        electronic,
        mfhd,
        items,
    } = bundle;

    if availability.is_blank() && mfhd.links.is_empty() {
        holding.remove = true;
    } else {
        holding.location_display_name = if availability.perm_location.is_empty() {
            holding.library_name.clone()
        } else {
            availability.perm_location.clone()
        };
        holding.display_call_no = availability.display_call_no.clone();
    }

    holding.availability = Some(availability);
    holding.electronic = Some(electronic);
    holding.mfhd = mfhd;
    holding.items = items;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dialect, PartnerKeyStyle, RecordSyntax, RemoteServer, Z3950Config};
    use crate::error::RemoteError;
    use crate::models::rows::{BibTextRow, HoldingRow, IndexHeadingRow, IndexedBibRow, ItemRow};
    use crate::repository::MockCatalogGateway;
    use crate::services::z3950::MockRemoteConnector;

    fn bib_row(bib_id: i32) -> BibTextRow {
        BibTextRow {
            bib_id,
            title: Some("Sample title / by someone".to_string()),
            author: Some("Doe, Jane.".to_string()),
            isbn: Some("0-123-45678-9 (paperback)".to_string()),
            oclc: Some("12345678".to_string()),
            language: Some("jpn".to_string()),
            library_name: "GW".to_string(),
            cjk_info: Some("100 山田太郎 // 24500 書名".to_string()),
            ..Default::default()
        }
    }

    fn gt_server() -> RemoteServer {
        RemoteServer {
            library: "GT".to_string(),
            address: "library.example.edu".to_string(),
            port: 210,
            database: "INNOPAC".to_string(),
            syntax: RecordSyntax::Opac,
            dialect: Dialect::Millennium,
            key_index_code: "907A".to_string(),
            key_style: PartnerKeyStyle::CheckDigitStripped,
            catalog_name: "GeorgeTown Catalog".to_string(),
            record_url: "http://catalog.example.edu/record=b{key}~S4".to_string(),
        }
    }

    fn service(gateway: MockCatalogGateway, connector: MockRemoteConnector) -> CatalogService {
        let gateway: Arc<dyn CatalogGateway> = Arc::new(gateway);
        let z3950 = Z3950Config {
            servers: vec![gt_server()],
            ..Default::default()
        };
        let remote = Z3950Service::new(gateway.clone(), Arc::new(connector), Arc::new(z3950));
        CatalogService::new(gateway, remote, Arc::new(CatalogConfig::default()))
    }

    fn holding_row(bib_id: i32, mfhd_id: i32, library: &str, location: &str) -> HoldingRow {
        HoldingRow {
            bib_id,
            mfhd_id,
            location_id: mfhd_id * 10,
            display_call_no: Some("QA76 .S2".to_string()),
            location_display_name: Some(location.to_string()),
            library_name: library.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_bib_is_none() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_bib_text().returning(|_| Ok(None));

        let service = service(gateway, MockRemoteConnector::new());
        assert!(service.get_bibliographic_data(99).await.unwrap().is_none());
        assert!(matches!(service.get_item(99).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_database_failures_propagate() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_bib_text()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        gateway
            .expect_holdings()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolClosed)));

        let service = service(gateway, MockRemoteConnector::new());
        assert!(matches!(
            service.get_bibliographic_data(1).await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(service.get_item(1).await, Err(AppError::Database(_))));

        let bib = BibliographicRecord {
            bib_id: 1,
            related_bibs: vec![RelatedBib { bib_id: 1, library_name: "GW".to_string() }],
            ..Default::default()
        };
        assert!(matches!(service.get_holdings(&bib).await, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_partner_key_failure_is_not_masked() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_holdings()
            .returning(|_| Ok(vec![holding_row(2, 20, "GT", "GT: Lauinger")]));
        gateway
            .expect_partner_keys()
            .returning(|_, _, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        let mut connector = MockRemoteConnector::new();
        connector.expect_search().times(0);

        let bib = BibliographicRecord {
            bib_id: 2,
            related_bibs: vec![RelatedBib { bib_id: 2, library_name: "GT".to_string() }],
            ..Default::default()
        };
        let result = service(gateway, connector).get_holdings(&bib).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_bibliographic_data_with_shared_isbn() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_bib_text().returning(|id| Ok(Some(bib_row(id))));
        gateway
            .expect_added_authors()
            .returning(|_| Ok(vec!["Roe, Richard.".to_string(), "  ".to_string()]));
        gateway
            .expect_standard_numbers()
            .withf(|_, scheme| *scheme == StandardNumberScheme::Isbn)
            .returning(|_, _| {
                Ok(vec![IndexHeadingRow {
                    normal_heading: "0123456789".to_string(),
                    display_heading: "0-123-45678-9 (paperback) ".to_string(),
                }])
            });
        gateway
            .expect_related_bibs()
            .withf(|scheme, numbers| {
                *scheme == StandardNumberScheme::Isbn && numbers == ["0123456789".to_string()]
            })
            .returning(|_, _| {
                Ok(vec![
                    IndexedBibRow {
                        bib_id: 1,
                        display_heading: "0-123-45678-9".to_string(),
                        library_name: "GW".to_string(),
                    },
                    IndexedBibRow {
                        bib_id: 2,
                        display_heading: "0123456789".to_string(),
                        library_name: "GT".to_string(),
                    },
                ])
            });

        let bib = service(gateway, MockRemoteConnector::new())
            .get_bibliographic_data(1)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(bib.oclc, "");
        assert_eq!(bib.authors, vec!["Doe, Jane", "Roe, Richard"]);
        assert_eq!(bib.language_display, "Japanese");
        let cjk = bib.cjk_info.as_ref().unwrap();
        assert_eq!(cjk.author.as_deref(), Some("山田太郎"));
        assert_eq!(cjk.title.as_deref(), Some("書名"));
        assert_eq!(bib.related_bib_ids(), vec![1, 2]);
        let isbn = bib.standard_numbers.isbn.unwrap();
        assert_eq!(isbn.normalized, vec!["0123456789"]);
        assert_eq!(isbn.display, vec!["0-123-45678-9 (paperback)"]);
        assert!(bib.standard_numbers.oclc.is_none());
    }

    #[tokio::test]
    async fn test_oclc_cross_links_need_a_marker() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_bib_text().returning(|id| {
            Ok(Some(BibTextRow {
                isbn: None,
                oclc: Some("(OCoLC)ocm12345678".to_string()),
                cjk_info: None,
                ..bib_row(id)
            }))
        });
        gateway.expect_added_authors().returning(|_| Ok(Vec::new()));
        gateway.expect_standard_numbers().returning(|_, _| {
            Ok(vec![
                IndexHeadingRow {
                    normal_heading: "12345678".to_string(),
                    display_heading: "(OCoLC)ocm12345678".to_string(),
                },
                IndexHeadingRow {
                    normal_heading: "87654321".to_string(),
                    display_heading: "87654321".to_string(),
                },
            ])
        });
        gateway.expect_related_bibs().returning(|_, _| {
            Ok(vec![
                IndexedBibRow {
                    bib_id: 5,
                    display_heading: "(OCoLC)12345678".to_string(),
                    library_name: "AU".to_string(),
                },
                IndexedBibRow {
                    bib_id: 6,
                    display_heading: "12345678".to_string(),
                    library_name: "CU".to_string(),
                },
            ])
        });

        let bib = service(gateway, MockRemoteConnector::new())
            .get_bibliographic_data(4)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(bib.oclc, "(OCoLC)ocm12345678");
        assert_eq!(bib.related_bib_ids(), vec![4, 5]);
        assert_eq!(bib.standard_numbers.oclc.unwrap().normalized, vec!["12345678"]);
        assert!(bib.cjk_info.is_none());
    }

    #[tokio::test]
    async fn test_local_and_degraded_remote_holdings() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_holdings().returning(|_| {
            Ok(vec![
                holding_row(1, 10, "GW", "GW: Gelman Stacks"),
                holding_row(2, 20, "GT", "GT: Lauinger"),
                holding_row(2, 21, "GT", "GT: Lauinger"),
                holding_row(3, 30, "AU", "Bender Library"),
            ])
        });
        gateway.expect_electronic_data().returning(|mfhd_id| {
            Ok(Some(crate::models::rows::ElectronicRow {
                mfhd_id,
                link866: (mfhd_id == 10).then(|| "$av.1-10".to_string()),
                ..Default::default()
            }))
        });
        gateway.expect_items().returning(|mfhd_id| {
            Ok(vec![ItemRow {
                item_id: mfhd_id * 100,
                bib_id: mfhd_id / 10,
                item_status: 1,
                item_status_desc: Some("Not Charged".to_string()),
                perm_location: Some(if mfhd_id == 30 { "AU: Reference" } else { "GW: Stacks" }.to_string()),
                display_call_no: Some("QA76 .S2".to_string()),
                ..Default::default()
            }])
        });
        gateway.expect_mfhd_text().returning(|_| Ok(None));
        gateway
            .expect_partner_keys()
            .times(1)
            .returning(|_, _, _| Ok(vec!["1234567".to_string()]));

        let mut connector = MockRemoteConnector::new();
        connector.expect_search().times(1).returning(|_, _| {
            Err(RemoteError::Connect {
                address: "library.example.edu:210".to_string(),
                message: "connection refused".to_string(),
            })
        });

        let bib = BibliographicRecord {
            bib_id: 1,
            related_bibs: vec![
                RelatedBib { bib_id: 1, library_name: "GW".to_string() },
                RelatedBib { bib_id: 2, library_name: "GT".to_string() },
                RelatedBib { bib_id: 3, library_name: "AU".to_string() },
            ],
            ..Default::default()
        };

        let holdings = service(gateway, connector).get_holdings(&bib).await.unwrap();

        let names: Vec<&str> = holdings.iter().map(|h| h.library_full_name.as_str()).collect();
        assert_eq!(names, vec!["American University", "George Washington University", "Georgetown University"]);

        let au = &holdings[0];
        assert!(!au.eligible);
        assert!(!au.items[0].eligible);
        assert_eq!(au.items[0].trimmed_location_display_name, "Reference");
        assert_eq!(au.trimmed_location_display_name, "Bender Library");

        let gw = &holdings[1];
        assert!(gw.eligible);
        assert_eq!(gw.library_has, vec!["v.1-10"]);
        assert_eq!(gw.trimmed_location_display_name, "Gelman Stacks");

        let gt = &holdings[2];
        let availability = gt.availability.as_ref().unwrap();
        assert!(availability.perm_location.starts_with("Click on the following link"));
        assert!(availability.perm_location.ends_with("record=b1234567~S4"));
        assert!(availability.item_status_desc.is_empty());
        assert!(gt.items.is_empty());
        assert!(!gt.remove);
    }

    #[tokio::test]
    async fn test_remote_holding_without_anything_is_removed() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_holdings()
            .returning(|_| Ok(vec![holding_row(2, 20, "GT", "GT: Lauinger")]));
        gateway.expect_partner_keys().returning(|_, _, _| Ok(Vec::new()));
        gateway.expect_bib_text().returning(|_| Ok(None));

        let bib = BibliographicRecord {
            bib_id: 2,
            related_bibs: vec![RelatedBib { bib_id: 2, library_name: "GT".to_string() }],
            ..Default::default()
        };

        let holdings = service(gateway, MockRemoteConnector::new())
            .get_holdings(&bib)
            .await
            .unwrap();
        assert!(holdings.is_empty());
    }

    #[tokio::test]
    async fn test_primary_bib_prefers_network_copy() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_bibs_by_number()
            .withf(|scheme, number| *scheme == StandardNumberScheme::Issn && number == "1234 5678")
            .returning(|_, _| {
                Ok(vec![
                    IndexedBibRow { bib_id: 8, display_heading: String::new(), library_name: "GW".to_string() },
                    IndexedBibRow { bib_id: 9, display_heading: String::new(), library_name: "WRLC".to_string() },
                ])
            });

        let service = service(gateway, MockRemoteConnector::new());
        assert_eq!(
            service.primary_bib_id(StandardNumberScheme::Issn, "1234-5678").await.unwrap(),
            Some(9)
        );
        assert_eq!(service.primary_bib_id(StandardNumberScheme::Isbn, "123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_partner_key_lookup_requires_partner_library() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_bib_for_partner_key()
            .withf(|key, code, style| key == "b1234567" && code == "907A" && *style == PartnerKeyStyle::CheckDigitStripped)
            .returning(|_, _, _| Ok(Some(321)));

        let service = service(gateway, MockRemoteConnector::new());
        assert_eq!(service.bib_id_for_partner_key("GT", "b1234567").await.unwrap(), Some(321));
        assert!(matches!(
            service.bib_id_for_partner_key("GW", "b1").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
