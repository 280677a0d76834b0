//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, publishers, records};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "KORMARC API",
        version = "0.3.0",
        description = "ISBN to KORMARC (MRK) cataloging service",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Records
        records::convert_batch,
        records::convert_one,
        records::export_mrk,
        // Publishers
        publishers::locate,
        publishers::list_publishers,
        publishers::create_publisher,
        publishers::delete_publisher,
        publishers::list_regions,
        publishers::create_region,
        publishers::delete_region,
        publishers::list_imprints,
        publishers::create_imprint,
        publishers::delete_imprint,
        publishers::import_registry,
    ),
    components(
        schemas(
            // Records
            crate::models::record::ConvertItem,
            crate::models::record::ConvertRequest,
            crate::models::record::BatchResponse,
            crate::models::record::ConversionOutcome,
            crate::models::record::ConversionResult,
            crate::models::record::ConversionMeta,
            crate::models::record::NameCandidates,
            crate::models::record::NameTrace,
            crate::text::people::Role,
            // Publishers
            crate::models::publisher::Publisher,
            crate::models::publisher::CreatePublisher,
            crate::models::publisher::Region,
            crate::models::publisher::CreateRegion,
            crate::models::publisher::Imprint,
            crate::models::publisher::CreateImprint,
            crate::models::publisher::RegistryImport,
            crate::models::publisher::ImportReport,
            crate::models::publisher::PublisherLocation,
            crate::models::publisher::LocationSource,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "records", description = "ISBN to KORMARC conversion"),
        (name = "publishers", description = "Publisher location and registry tables")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
