pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

#[cfg(test)]
pub mod testing;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::user_extractor;
use crate::state::AppState;

pub use crate::config::AppConfig;
pub use crate::error::ApiError;

/// Full HTTP surface: public reads, token-gated writes, JSON 404 fallback
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(blog_routes(&state))
        .fallback(handlers::unknown_endpoint)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn blog_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::{post, put};
    use handlers::blogs;

    // The gate runs before the handler body and short-circuits on rejection
    let require_user = || from_fn_with_state(state.clone(), user_extractor);

    Router::new()
        .route(
            "/api/blogs",
            get(blogs::list).merge(post(blogs::create).route_layer(require_user())),
        )
        .route(
            "/api/blogs/:id",
            get(blogs::show).merge(
                put(blogs::update)
                    .delete(blogs::remove)
                    .route_layer(require_user()),
            ),
        )
}
