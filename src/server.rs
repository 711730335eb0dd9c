//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{
    extract::DefaultBodyLimit,
    http::{header::X_CONTENT_TYPE_OPTIONS, HeaderValue},
    routing::{get, post, put},
    Router,
};
use cert_render::FontResolver;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::api::{admin, public};
use crate::assets::AssetLoader;
use crate::models::AppConfig;
use crate::services::{CaptchaService, CertificateService, FileStorage, InMemoryStore, UrlSigner};

/// Largest accepted upload (templates, certificates, CSV files)
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<InMemoryStore>,
    pub storage: Arc<FileStorage>,
    pub certificates: Arc<CertificateService>,
    pub captcha: Arc<CaptchaService>,
    pub signer: Arc<UrlSigner>,
    pub fonts: Arc<FontResolver>,
}

/// Create application state from an asset loader.
pub fn create_app_state(asset_loader: Arc<AssetLoader>) -> anyhow::Result<AppState> {
    let config = AppConfig::load_from_assets(&asset_loader);

    let storage = Arc::new(FileStorage::new(
        &config.storage.templates_dir,
        &config.storage.certificates_dir,
    ));
    storage.ensure_dirs().map_err(|e| {
        anyhow::anyhow!(
            "Failed to create storage directories under {}: {e}",
            config.storage.templates_dir.display()
        )
    })?;

    let fonts = Arc::new(FontResolver::new(asset_loader.fonts_dir()));
    let signer = Arc::new(link_signer(&config));
    let store = Arc::new(InMemoryStore::seeded(&config));
    let certificates = Arc::new(CertificateService::new(fonts.clone(), storage.clone()));
    let captcha = Arc::new(CaptchaService::with_limit(
        Duration::from_secs(config.captcha.ttl_secs),
        config.captcha.max_pending,
    ));

    Ok(AppState {
        config: Arc::new(config),
        store,
        storage,
        certificates,
        captcha,
        signer,
        fonts,
    })
}

fn link_signer(config: &AppConfig) -> UrlSigner {
    let validity = config.links.validity_secs;
    let secret = std::env::var("LINK_SECRET")
        .ok()
        .or_else(|| config.links.secret.clone())
        .filter(|s| !s.is_empty());

    match secret {
        Some(secret) => UrlSigner::new(secret.as_bytes(), validity),
        None => {
            tracing::warn!(
                "No LINK_SECRET configured, using a random secret; certificate links will not survive a restart"
            );
            UrlSigner::with_random_secret(validity)
        }
    }
}

/// Build the API router with all endpoints and middleware.
///
/// This is the core router used by both production and tests.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/events", get(public::list_events))
        .route("/api/archive", get(public::list_archive))
        .route("/api/events/:id", get(public::get_event))
        .route("/api/events/:id/captcha", get(public::issue_captcha))
        .route("/api/events/:id/verify", post(public::verify_email))
        .route(
            "/api/certificates/:participant_id/preview",
            get(public::preview_certificate),
        )
        .route(
            "/api/certificates/:participant_id/download",
            get(public::download_certificate),
        );

    let admin_routes = Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route(
            "/api/admin/events",
            get(admin::list_events).post(admin::create_event),
        )
        .route(
            "/api/admin/events/:id",
            get(admin::get_event)
                .put(admin::update_event)
                .delete(admin::delete_event),
        )
        .route(
            "/api/admin/events/:id/visibility",
            post(admin::toggle_visibility),
        )
        .route("/api/admin/events/:id/archive", post(admin::set_archive))
        .route(
            "/api/admin/events/:id/protection",
            post(admin::set_protection),
        )
        .route(
            "/api/admin/events/:id/template",
            put(admin::upload_template)
                .get(admin::get_template)
                .delete(admin::delete_template),
        )
        .route(
            "/api/admin/events/:id/placement",
            put(admin::update_placement),
        )
        .route("/api/admin/events/:id/preview", get(admin::preview))
        .route(
            "/api/admin/events/:id/participants",
            get(admin::list_participants).post(admin::add_participant),
        )
        .route(
            "/api/admin/events/:id/participants/import",
            post(admin::import_participants),
        )
        .route(
            "/api/admin/participants/:id",
            put(admin::update_participant).delete(admin::delete_participant),
        )
        .route(
            "/api/admin/participants/:id/certificate",
            put(admin::upload_certificate),
        )
        .route("/api/admin/fonts", get(admin::list_fonts))
        .route("/api/admin/logs", get(admin::admin_logs))
        .route("/api/admin/logs/downloads", get(admin::download_logs));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Add state and tracing
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}
