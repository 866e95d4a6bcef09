//! Catalog query gateway.
//!
//! Read-only, parameterized queries over the catalog schema (bib_text,
//! bib_master, bib_index, bib_mfhd, mfhd_master, item tables). The MARC tag
//! helpers of the `wrlcdb` schema return tags flattened to subfield text.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    config::{IndexCodes, PartnerKeyStyle},
    error::AppResult,
    models::{
        rows::{
            BibTextRow, ElectronicRow, HoldingRow, IndexHeadingRow, IndexedBibRow, ItemRow,
            MfhdTextRow, RightTrim,
        },
        StandardNumberScheme,
    },
};

/// Queries the aggregator needs from the relational catalog. Failures are
/// returned as-is; retry policy belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Core bib text; `None` if absent, suppressed, or without a library
    async fn bib_text(&self, bib_id: i32) -> AppResult<Option<BibTextRow>>;

    /// Added-entry author headings
    async fn added_authors(&self, bib_id: i32) -> AppResult<Vec<String>>;

    /// Index entries of one scheme attached to a bib
    async fn standard_numbers(
        &self,
        bib_id: i32,
        scheme: StandardNumberScheme,
    ) -> AppResult<Vec<IndexHeadingRow>>;

    /// Every bib sharing a normal heading with any bib that carries one of
    /// `normalized`, ordered by bib id
    async fn related_bibs(
        &self,
        scheme: StandardNumberScheme,
        normalized: &[String],
    ) -> AppResult<Vec<IndexedBibRow>>;

    /// Bibs indexed under exactly this normal heading
    async fn bibs_by_number(
        &self,
        scheme: StandardNumberScheme,
        normalized: &str,
    ) -> AppResult<Vec<IndexedBibRow>>;

    /// Unsuppressed MFHDs of the given bibs, ordered by library code
    async fn holdings(&self, bib_ids: &[i32]) -> AppResult<Vec<HoldingRow>>;

    async fn mfhd_text(&self, mfhd_id: i32) -> AppResult<Option<MfhdTextRow>>;

    async fn electronic_data(&self, mfhd_id: i32) -> AppResult<Option<ElectronicRow>>;

    /// Items of an MFHD, most recent status first within each location
    async fn items(&self, mfhd_id: i32) -> AppResult<Vec<ItemRow>>;

    /// Partner catalog keys recorded on a local bib
    async fn partner_keys(
        &self,
        bib_id: i32,
        index_code: &str,
        style: PartnerKeyStyle,
    ) -> AppResult<Vec<String>>;

    /// Local bib recorded under a partner catalog key
    async fn bib_for_partner_key(
        &self,
        key: &str,
        index_code: &str,
        style: PartnerKeyStyle,
    ) -> AppResult<Option<i32>>;

    async fn ping(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
    index_codes: IndexCodes,
}

impl CatalogRepository {
    pub fn new(pool: Pool<Postgres>, index_codes: IndexCodes) -> Self {
        Self { pool, index_codes }
    }

    fn codes(&self, scheme: StandardNumberScheme) -> Vec<String> {
        self.index_codes.for_scheme(scheme).to_vec()
    }
}

const ITEMS_QUERY: &str = r#"
    SELECT DISTINCT mfhd_master.display_call_no, item_status_type.item_status_desc,
           item_status.item_status,
           perm_location.location_display_name AS perm_location,
           temp_location.location_display_name AS temp_location,
           mfhd_item.item_enum, mfhd_item.chron, item.item_id,
           item_status.item_status_date, bib_master.bib_id
    FROM bib_master
    JOIN library ON library.library_id = bib_master.library_id
    JOIN bib_text ON bib_text.bib_id = bib_master.bib_id
    JOIN bib_mfhd ON bib_master.bib_id = bib_mfhd.bib_id
    JOIN mfhd_master ON mfhd_master.mfhd_id = bib_mfhd.mfhd_id
    JOIN mfhd_item ON mfhd_item.mfhd_id = mfhd_master.mfhd_id
    JOIN item ON item.item_id = mfhd_item.item_id
    JOIN item_status ON item_status.item_id = item.item_id
    JOIN item_status_type ON item_status.item_status = item_status_type.item_status_type
    JOIN location perm_location ON perm_location.location_id = item.perm_location
    LEFT OUTER JOIN location temp_location ON temp_location.location_id = item.temp_location
    WHERE bib_mfhd.mfhd_id = $1
    ORDER BY perm_location, temp_location, item_status.item_status_date DESC
"#;

#[async_trait]
impl CatalogGateway for CatalogRepository {
    async fn bib_text(&self, bib_id: i32) -> AppResult<Option<BibTextRow>> {
        let row = sqlx::query_as::<_, BibTextRow>(
            r#"
            SELECT bib_text.bib_id, title, author, edition, isbn, issn,
                   network_number AS oclc, publisher, pub_place, imprint, bib_format,
                   language, library.library_name, publisher_date,
                   RTRIM(wrlcdb.get_marc_field($1, 0, 0, '856', '', 'u', 1)) AS link,
                   wrlcdb.get_all_bib_tag($1, '880', 1) AS cjk_info,
                   RTRIM(wrlcdb.get_marc_field($1, 0, 0, '856', '', 'z', 1)) AS message
            FROM bib_text
            JOIN bib_master ON bib_master.bib_id = bib_text.bib_id
            JOIN library ON library.library_id = bib_master.library_id
            WHERE bib_text.bib_id = $1
              AND bib_master.suppress_in_opac = 'N'
            "#,
        )
        .bind(bib_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RightTrim::right_trimmed))
    }

    async fn added_authors(&self, bib_id: i32) -> AppResult<Vec<String>> {
        let rows = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT display_heading
            FROM bib_index
            WHERE bib_id = $1
              AND index_code = ANY($2)
            "#,
        )
        .bind(bib_id)
        .bind(&self.index_codes.added_authors)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().flatten().map(RightTrim::right_trimmed).collect())
    }

    async fn standard_numbers(
        &self,
        bib_id: i32,
        scheme: StandardNumberScheme,
    ) -> AppResult<Vec<IndexHeadingRow>> {
        let rows = sqlx::query_as::<_, IndexHeadingRow>(
            r#"
            SELECT normal_heading, display_heading
            FROM bib_index
            WHERE index_code = ANY($1)
              AND bib_id = $2
            ORDER BY normal_heading
            "#,
        )
        .bind(self.codes(scheme))
        .bind(bib_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RightTrim::right_trimmed).collect())
    }

    async fn related_bibs(
        &self,
        scheme: StandardNumberScheme,
        normalized: &[String],
    ) -> AppResult<Vec<IndexedBibRow>> {
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, IndexedBibRow>(
            r#"
            SELECT DISTINCT bib_index.bib_id, bib_index.display_heading, library.library_name
            FROM bib_index
            JOIN bib_master ON bib_master.bib_id = bib_index.bib_id
            JOIN library ON library.library_id = bib_master.library_id
            WHERE bib_index.index_code = ANY($1)
              AND bib_index.normal_heading IN (
                  SELECT normal_heading
                  FROM bib_index
                  WHERE bib_id IN (
                      SELECT DISTINCT bib_id
                      FROM bib_index
                      WHERE index_code = ANY($1)
                        AND normal_heading = ANY($2)
                  )
              )
            ORDER BY bib_index.bib_id
            "#,
        )
        .bind(self.codes(scheme))
        .bind(normalized)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RightTrim::right_trimmed).collect())
    }

    async fn bibs_by_number(
        &self,
        scheme: StandardNumberScheme,
        normalized: &str,
    ) -> AppResult<Vec<IndexedBibRow>> {
        let rows = sqlx::query_as::<_, IndexedBibRow>(
            r#"
            SELECT bib_index.bib_id, bib_index.display_heading, library.library_name
            FROM bib_index
            JOIN bib_master ON bib_master.bib_id = bib_index.bib_id
            JOIN library ON library.library_id = bib_master.library_id
            WHERE bib_index.index_code = ANY($1)
              AND bib_index.normal_heading = $2
            "#,
        )
        .bind(self.codes(scheme))
        .bind(normalized)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RightTrim::right_trimmed).collect())
    }

    async fn holdings(&self, bib_ids: &[i32]) -> AppResult<Vec<HoldingRow>> {
        if bib_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, HoldingRow>(
            r#"
            SELECT bib_mfhd.bib_id, mfhd_master.mfhd_id, mfhd_master.location_id,
                   mfhd_master.display_call_no, location.location_display_name,
                   library.library_name
            FROM bib_mfhd
            JOIN mfhd_master ON bib_mfhd.mfhd_id = mfhd_master.mfhd_id
            JOIN location ON mfhd_master.location_id = location.location_id
            JOIN bib_master ON bib_mfhd.bib_id = bib_master.bib_id
            JOIN library ON bib_master.library_id = library.library_id
            WHERE bib_mfhd.bib_id = ANY($1)
              AND mfhd_master.suppress_in_opac != 'Y'
            ORDER BY library.library_name
            "#,
        )
        .bind(bib_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RightTrim::right_trimmed).collect())
    }

    async fn mfhd_text(&self, mfhd_id: i32) -> AppResult<Option<MfhdTextRow>> {
        let row = sqlx::query_as::<_, MfhdTextRow>(
            r#"
            SELECT RTRIM(wrlcdb.get_all_tags($1, 'M', '852', 2)) AS marc852,
                   RTRIM(wrlcdb.get_all_tags($1, 'M', '856', 2)) AS marc856,
                   RTRIM(wrlcdb.get_all_tags($1, 'M', '866', 2)) AS marc866
            FROM mfhd_master
            WHERE mfhd_id = $1
            "#,
        )
        .bind(mfhd_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RightTrim::right_trimmed))
    }

    async fn electronic_data(&self, mfhd_id: i32) -> AppResult<Option<ElectronicRow>> {
        let row = sqlx::query_as::<_, ElectronicRow>(
            r#"
            SELECT mfhd_id,
                   RTRIM(wrlcdb.get_mfhd_subfield($1, '856', 'u')) AS link856u,
                   RTRIM(wrlcdb.get_mfhd_subfield($1, '856', 'z')) AS link856z,
                   RTRIM(wrlcdb.get_mfhd_subfield($1, '852', 'z')) AS link852z,
                   RTRIM(wrlcdb.get_mfhd_subfield($1, '852', 'a')) AS link852a,
                   RTRIM(wrlcdb.get_mfhd_subfield($1, '852', 'h')) AS link852h,
                   RTRIM(wrlcdb.get_all_tags($1, 'M', '866', 2)) AS link866,
                   RTRIM(wrlcdb.get_mfhd_subfield($1, '856', '3')) AS link8563
            FROM mfhd_master
            WHERE mfhd_id = $1
            "#,
        )
        .bind(mfhd_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RightTrim::right_trimmed))
    }

    async fn items(&self, mfhd_id: i32) -> AppResult<Vec<ItemRow>> {
        let rows = sqlx::query_as::<_, ItemRow>(ITEMS_QUERY)
            .bind(mfhd_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RightTrim::right_trimmed).collect())
    }

    async fn partner_keys(
        &self,
        bib_id: i32,
        index_code: &str,
        style: PartnerKeyStyle,
    ) -> AppResult<Vec<String>> {
        let query = match style {
            PartnerKeyStyle::Verbatim => {
                r#"
                SELECT normal_heading
                FROM bib_index
                WHERE bib_id = $1
                  AND index_code = $2
                  AND normal_heading = display_heading
                "#
            }
            PartnerKeyStyle::CheckDigitStripped => {
                r#"
                SELECT LOWER(SUBSTR(normal_heading, 1, LENGTH(normal_heading) - 1))
                FROM bib_index
                WHERE bib_id = $1
                  AND index_code = $2
                "#
            }
        };

        let rows = sqlx::query_scalar::<_, Option<String>>(query)
            .bind(bib_id)
            .bind(index_code)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().flatten().map(RightTrim::right_trimmed).collect())
    }

    async fn bib_for_partner_key(
        &self,
        key: &str,
        index_code: &str,
        style: PartnerKeyStyle,
    ) -> AppResult<Option<i32>> {
        let (query, key) = match style {
            PartnerKeyStyle::Verbatim => (
                r#"
                SELECT bib_id
                FROM bib_index
                WHERE index_code = $1
                  AND normal_heading = display_heading
                  AND normal_heading = $2
                "#,
                key.to_string(),
            ),
            PartnerKeyStyle::CheckDigitStripped => (
                r#"
                SELECT bib_id
                FROM bib_index
                WHERE index_code = $1
                  AND normal_heading = $2
                "#,
                key.to_uppercase(),
            ),
        };

        let bib_id = sqlx::query_scalar::<_, i32>(query)
            .bind(index_code)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bib_id)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
