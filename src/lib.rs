pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;

use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use auth::{Authorizer, KeySet};
pub use config::Config;
pub use db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<Authorizer>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Drinks menu
        .route(
            "/drinks",
            get(handlers::list_drinks).post(handlers::create_drink),
        )
        .route("/drinks-detail", get(handlers::list_drinks_detail))
        .route(
            "/drinks/{id}",
            patch(handlers::update_drink).delete(handlers::delete_drink),
        )
        // Health check
        .route("/healthcheck", get(handlers::healthcheck))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
