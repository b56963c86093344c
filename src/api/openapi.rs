//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{forecast, health, FUNCTION_KEY_HEADER};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reservation Forecast API",
        version = "1.0.0",
        description = "Monthly equipment reservation forecasts",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Forecast
        forecast::http_trigger,
    ),
    components(
        schemas(
            crate::models::reservation::ForecastPoint,
            crate::models::reservation::ReservationCount,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "forecast", description = "Reservation forecasts")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "function_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(FUNCTION_KEY_HEADER))),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
