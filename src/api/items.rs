//! Item endpoints: bibliographic records with their holdings

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{BibliographicRecord, StandardNumberScheme},
    AppState,
};

/// Full item view
#[derive(Serialize, ToSchema)]
pub struct ItemResponse {
    /// Bibliographic record, holdings included
    pub bib: BibliographicRecord,
    /// Interlibrary loan request link for this record
    pub illiad_link: String,
}

#[derive(Serialize, ToSchema)]
pub struct LookupResponse {
    pub bib_id: i32,
}

/// Get a bibliographic record with holdings, availability and eligibility
#[utoipa::path(
    get,
    path = "/items/{bib_id}",
    tag = "items",
    params(
        ("bib_id" = i32, Path, description = "Bib ID")
    ),
    responses(
        (status = 200, description = "Item details", body = ItemResponse),
        (status = 404, description = "Bib not found", body = crate::error::ErrorResponse),
        (status = 503, description = "Catalog database unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(bib_id): Path<i32>,
) -> AppResult<Json<ItemResponse>> {
    let bib = state.services.catalog.get_item(bib_id).await?;
    let illiad_link = state.services.catalog.document_request_url(&bib);
    Ok(Json(ItemResponse { bib, illiad_link }))
}

/// Get a bibliographic record and its related bibs, without holdings
#[utoipa::path(
    get,
    path = "/bibs/{bib_id}",
    tag = "items",
    params(
        ("bib_id" = i32, Path, description = "Bib ID")
    ),
    responses(
        (status = 200, description = "Bibliographic record", body = BibliographicRecord),
        (status = 404, description = "Bib not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_bib(
    State(state): State<AppState>,
    Path(bib_id): Path<i32>,
) -> AppResult<Json<BibliographicRecord>> {
    let bib = state
        .services
        .catalog
        .get_bibliographic_data(bib_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bib {} not found", bib_id)))?;
    Ok(Json(bib))
}

/// Resolve a standard number to the bib to display
#[utoipa::path(
    get,
    path = "/lookup/{scheme}/{number}",
    tag = "items",
    params(
        ("scheme" = StandardNumberScheme, Path, description = "isbn, issn or oclc"),
        ("number" = String, Path, description = "Raw standard number")
    ),
    responses(
        (status = 200, description = "Matching bib", body = LookupResponse),
        (status = 404, description = "No bib carries this number", body = crate::error::ErrorResponse)
    )
)]
pub async fn lookup_standard_number(
    State(state): State<AppState>,
    Path((scheme, number)): Path<(StandardNumberScheme, String)>,
) -> AppResult<Json<LookupResponse>> {
    let bib_id = state
        .services
        .catalog
        .primary_bib_id(scheme, &number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No bib with {} {}", scheme, number)))?;
    Ok(Json(LookupResponse { bib_id }))
}

/// Resolve a partner catalog record key to the local bib
#[utoipa::path(
    get,
    path = "/partners/{library}/{key}",
    tag = "items",
    params(
        ("library" = String, Path, description = "Partner library code"),
        ("key" = String, Path, description = "Partner catalog record key")
    ),
    responses(
        (status = 200, description = "Matching bib", body = LookupResponse),
        (status = 400, description = "Library has no partner catalog", body = crate::error::ErrorResponse),
        (status = 404, description = "Key not recorded locally", body = crate::error::ErrorResponse)
    )
)]
pub async fn lookup_partner_key(
    State(state): State<AppState>,
    Path((library, key)): Path<(String, String)>,
) -> AppResult<Json<LookupResponse>> {
    let bib_id = state
        .services
        .catalog
        .bib_id_for_partner_key(&library, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No bib for {} record {}", library, key)))?;
    Ok(Json(LookupResponse { bib_id }))
}
