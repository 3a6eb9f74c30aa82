//! OpenAPI specification endpoints

use actix_web::{HttpResponse, Responder, get};
use utoipa::OpenApi;

use crate::api::error::ErrorResponse;
use crate::api::health::{self, HealthStatus};
use crate::api::plan;
use crate::model::{PlanRequest, ResultMessage, RiskScores};

#[derive(OpenApi)]
#[openapi(
    paths(plan::generate_plan, plan::preview_plan, health::liveness),
    components(schemas(PlanRequest, RiskScores, ResultMessage, ErrorResponse, HealthStatus)),
    tags(
        (name = "plans", description = "Personalized evacuation plan generation"),
        (name = "health", description = "Service health probes")
    ),
    info(
        title = "Evacuation Plan Service",
        description = "Generates a personalized evacuation plan for an address and emails it as a PDF"
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> HttpResponse {
    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => HttpResponse::Ok().content_type("text/yaml").body(yaml),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize OpenAPI document as YAML");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
