// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod session;

use crate::config::AppConfig;
use crate::handlers::{
    create_session, delete_session, export_preview, get_preview, get_session, list_sessions,
    list_styles, loading_steps, navigate, regenerate, reset_session, select_style, start_session,
    upload_data_url, upload_image,
};
use crate::services::{GeminiClient, ImageProcessor, SessionStore, StylingPipeline, StylistService};

const JSON_LIMIT_BYTES: usize = 32 * 1024 * 1024;
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
    pipeline: Arc<StylingPipeline>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting FitGenius service...");

    let config = AppConfig::from_env()?;

    // Initialize services
    let gemini = Arc::new(GeminiClient::new(&config)?);
    let stylist = Arc::new(StylistService::new(gemini, &config));
    let sessions = Arc::new(SessionStore::with_idle_ttl(config.session_ttl));
    if let Some(ttl) = config.session_ttl {
        info!("Evicting sessions idle for more than {}s", ttl.as_secs());
        sessions.clone().spawn_sweeper(SESSION_SWEEP_INTERVAL.min(ttl));
    }
    let image_processor = Arc::new(ImageProcessor::new(config.max_image_dimension));
    let pipeline = Arc::new(StylingPipeline::new(
        sessions.clone(),
        stylist,
        image_processor,
    ));

    let app_state = AppState { sessions, pipeline };

    info!(
        "Using {} (analysis: {}, outfits: {}, previews: {})",
        config.base_url, config.analysis_model, config.recommendation_model, config.image_model
    );
    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(JSON_LIMIT_BYTES))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/styles", web::get().to(list_styles))
            .route("/loading-steps", web::get().to(loading_steps))
            .route("/sessions", web::post().to(create_session))
            .route("/sessions", web::get().to(list_sessions))
            .route("/sessions/{id}", web::get().to(get_session))
            .route("/sessions/{id}", web::delete().to(delete_session))
            .route("/sessions/{id}/start", web::post().to(start_session))
            .route("/sessions/{id}/upload", web::post().to(upload_image))
            .route("/sessions/{id}/upload-url", web::post().to(upload_data_url))
            .route("/sessions/{id}/style", web::post().to(select_style))
            .route("/sessions/{id}/regenerate", web::post().to(regenerate))
            .route("/sessions/{id}/navigate", web::post().to(navigate))
            .route("/sessions/{id}/reset", web::post().to(reset_session))
            .route("/sessions/{id}/preview", web::get().to(get_preview))
            .route("/sessions/{id}/export", web::get().to(export_preview)),
    )
    .route("/health", web::get().to(health_check));
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "fitgenius",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
