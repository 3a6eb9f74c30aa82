use actix_web::{App, HttpServer, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod model;
mod service;

use api::plan::PreviewEnabled;
use app::AppState;
use model::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let state = AppState::new(config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize services");
        std::io::Error::other(e.to_string())
    })?;

    let plan_service = web::Data::new(state.plan_service);
    let preview = web::Data::new(PreviewEnabled(state.preview_enabled));

    tracing::info!("Starting evacuation plan server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(plan_service.clone())
            .app_data(preview.clone())
            .configure(api::plan::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
