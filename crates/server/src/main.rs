//! inacbg-server: INA-CBG coding assistant HTTP server

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inacbg_core::{CaseDatabase, CoreError};
use inacbg_server::ai::{self, GroqClient, LanguageModel};
use inacbg_server::config::{self, Config, ConfigError};
use inacbg_server::retrieval::IndexCache;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e @ ConfigError::MissingApiKey { .. }) => {
            tracing::error!(error = %e, "Missing LLM API key");
            eprintln!("{}", config::api_key_help());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let database = match CaseDatabase::load(&config.database_file) {
        Ok(db) => db,
        Err(e @ CoreError::DatabaseNotFound(_)) => {
            tracing::error!(
                error = %e,
                "Case database missing. Convert the source PDF to {} first",
                config.database_file.display()
            );
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load case database");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        cases = database.total_cases(),
        file = %config.database_file.display(),
        "Case database loaded"
    );

    let http = match ai::http_client(config.http_timeout_secs) {
        Ok(http) => http,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let embedder = match ai::create_embedder(&config.embedding, http.clone()) {
        Ok(embedder) => embedder,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize embeddings");
            return ExitCode::FAILURE;
        }
    };
    let model: Arc<dyn LanguageModel> = Arc::new(GroqClient::new(http, &config.llm));
    tracing::info!(
        llm = model.model_name(),
        embeddings = embedder.model_name(),
        "Models configured"
    );

    let cache = Arc::new(IndexCache::new());
    let state = match inacbg_server::assemble(&config, database, embedder, model, cache).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build vector index");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Rate limiting: {} requests/second", config.rate_limit_rps);

    let app = inacbg_server::build_app(state, &config);

    let addr: SocketAddr = match config.bind_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(address = %config.bind_address, error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Starting INA-CBG assistant on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
