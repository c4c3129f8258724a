//! HTTP API layer for foodgram-rs.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: ingredients, recipes, users and subscriptions under `/api`,
//!   plus the short-link redirect at the site root
//! - **Extractors**: Authenticated and optional users
//! - **Middleware**: Token authentication
//! - **Pagination**: Page-number pagination with absolute `next`/`previous` links
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod pagination;
pub mod response;

use axum::{Router, middleware::from_fn_with_state};

pub use endpoints::{router, short_link_router};
pub use middleware::AppState;

/// The full application: the API under `/api`, short-link redirects at the
/// root, token authentication on every route.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .merge(short_link_router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
