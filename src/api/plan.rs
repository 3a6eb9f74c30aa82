//! REST API endpoints for evacuation plans

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, get, post, web};

use crate::api::error::{ApiError, ErrorResponse};
use crate::model::{PlanRequest, ResultMessage};
use crate::service::PlanService;

/// Whether the sample-data preview endpoint is served
#[derive(Debug, Clone, Copy)]
pub struct PreviewEnabled(pub bool);

/// Generate an evacuation plan and email it as PDF
#[utoipa::path(
    post,
    path = "/api/generate-plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Plan generated and emailed", body = ResultMessage),
        (status = 400, description = "Missing or invalid address, email or risk scores", body = ErrorResponse),
        (status = 500, description = "Plan could not be generated or delivered", body = ErrorResponse)
    ),
    tag = "plans"
)]
#[post("/api/generate-plan")]
pub async fn generate_plan(
    service: web::Data<PlanService>,
    body: web::Json<PlanRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();

    tracing::info!(address = %request.address, email = %request.email, "Evacuation plan requested");

    let recipient = service.generate_and_send(request).await?;

    Ok(HttpResponse::Ok().json(ResultMessage {
        message: format!("Your evacuation plan has been sent to {}!", recipient),
    }))
}

/// Render a plan for sample data and return the PDF directly
#[utoipa::path(
    get,
    path = "/api/generate-plan",
    responses(
        (status = 200, description = "Sample plan PDF (application/pdf attachment)"),
        (status = 404, description = "Preview disabled", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse)
    ),
    tag = "plans"
)]
#[get("/api/generate-plan")]
pub async fn preview_plan(
    service: web::Data<PlanService>,
    preview: web::Data<PreviewEnabled>,
) -> Result<HttpResponse, ApiError> {
    if !preview.0 {
        return Err(ApiError::NotFound("/api/generate-plan".to_string()));
    }

    let pdf = service.render_preview().await?;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(
                "evacuation-plan-preview.pdf".to_string(),
            )],
        })
        .body(pdf))
}

/// Turn body extraction failures into the standard error response
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("malformed JSON body: {}", err)).into()
    })
}

/// Configure plan routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(generate_plan)
        .service(preview_plan);
}
