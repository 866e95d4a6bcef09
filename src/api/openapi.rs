//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, items, z3950};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Launchpad API",
        version = "0.3.0",
        description = "Consortium catalog item view: bibliographic data, holdings and loan eligibility",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items
        items::get_item,
        items::get_bib,
        items::lookup_standard_number,
        items::lookup_partner_key,
        // Z39.50
        z3950::remote_holdings,
    ),
    components(
        schemas(
            // Items
            items::ItemResponse,
            items::LookupResponse,
            crate::models::BibliographicRecord,
            crate::models::StandardNumbers,
            crate::models::StandardNumberSet,
            crate::models::StandardNumberScheme,
            crate::models::CjkInfo,
            crate::models::RelatedBib,
            crate::models::Holding,
            crate::models::Item,
            crate::models::Availability,
            crate::models::ElectronicLink,
            crate::models::MarcHoldingsBlock,
            crate::models::LinkEntry,
            // Z39.50
            crate::services::z3950::RemoteHoldings,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Bibliographic records and holdings"),
        (name = "z3950", description = "Partner catalog searches")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_item_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/items/{bib_id}"));
        assert!(doc.paths.paths.contains_key("/lookup/{scheme}/{number}"));
        assert!(doc.paths.paths.contains_key("/partners/{library}/{key}"));
    }
}
