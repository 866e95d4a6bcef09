//! Z39.50 endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::StandardNumberScheme,
    services::z3950::{RemoteHoldings, SearchKey},
    AppState,
};

/// Search a partner catalog directly by standard number
#[utoipa::path(
    get,
    path = "/z3950/{library}/{scheme}/{number}",
    tag = "z3950",
    params(
        ("library" = String, Path, description = "Partner library code"),
        ("scheme" = StandardNumberScheme, Path, description = "isbn, issn or oclc"),
        ("number" = String, Path, description = "Standard number")
    ),
    responses(
        (status = 200, description = "Partner holdings, or a placeholder when the partner is unreachable", body = RemoteHoldings),
        (status = 400, description = "Library has no partner catalog", body = crate::error::ErrorResponse)
    )
)]
pub async fn remote_holdings(
    State(state): State<AppState>,
    Path((library, scheme, number)): Path<(String, StandardNumberScheme, String)>,
) -> AppResult<Json<RemoteHoldings>> {
    let z3950 = &state.services.z3950;
    let server = z3950
        .server_for(&library)
        .ok_or_else(|| AppError::BadRequest(format!("{} has no partner catalog", library)))?;

    let key = match scheme {
        StandardNumberScheme::Isbn => SearchKey::Isbn(number),
        StandardNumberScheme::Issn => SearchKey::Issn(number),
        StandardNumberScheme::Oclc => SearchKey::Oclc(number),
    };

    let holdings = z3950.holdings(server, &key).await?;
    Ok(Json(holdings))
}
