mod chat;
mod conversations;
pub mod health;
pub mod metrics;
mod search;
mod session;
pub mod status;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

/// Build the session, conversation and chat routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(session::get))
        .route("/session/reset", post(session::reset))
        .route(
            "/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/{id}",
            get(conversations::read).delete(conversations::delete),
        )
        .route("/conversations/{id}/select", post(conversations::select))
        .route("/chat", post(chat::ask))
        .route("/search", get(search::search))
}
