//! inacbg-server library crate
//!
//! Exposes `build_app`, `assemble` and the service modules for integration
//! tests. The binary entrypoint is in `main.rs`.

pub mod ai;
pub mod config;
mod error;
mod middleware;
pub mod retrieval;
mod routes;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use inacbg_core::{CaseDatabase, chunk_cases};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ai::{AiError, AnswerGenerator, Embedder, LanguageModel};
use config::Config;
use retrieval::{IndexCache, Retriever};
use session::SessionController;
use store::{ConversationStore, IdentityStore};

pub use error::AppError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionController>,
    pub retriever: Arc<Retriever>,
    pub index_cache: Arc<IndexCache>,
    pub top_k: usize,
}

/// Wire the case database, models and stores into handler state.
///
/// Chunks every case, then embeds them through `cache`. The cache is kept in
/// the returned state; assembling again over the same cache with the same
/// cases and embedding model reuses the built index.
pub async fn assemble(
    config: &Config,
    database: CaseDatabase,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
    cache: Arc<IndexCache>,
) -> Result<AppState, AiError> {
    let documents = chunk_cases(&database);
    let index = cache
        .get_or_build(documents, embedder.as_ref(), config.embedding.batch_size)
        .await?;

    let retriever = Arc::new(Retriever::new(Arc::new(database), index, embedder));
    let answers = AnswerGenerator::new(Arc::clone(&retriever), model, config.top_k);
    let session = SessionController::new(
        IdentityStore::new(&config.user_id_file),
        ConversationStore::new(&config.history_dir),
        answers,
    );

    Ok(AppState {
        session: Arc::new(session),
        retriever,
        index_cache: cache,
        top_k: config.top_k,
    })
}

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Rate limited: everything that touches the session or the models
    let api_routes = routes::api_routes()
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    let prometheus_handle = middleware::metrics::prometheus_handle();

    let public_routes = Router::new()
        .route("/health", get(routes::health::check))
        .route("/status", get(routes::status::get))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
