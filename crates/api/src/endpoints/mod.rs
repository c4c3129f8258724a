//! API endpoints.

mod ingredients;
mod recipes;
mod short_links;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(ingredients::router())
        .merge(recipes::router())
        .merge(users::router())
}

/// Routes served at the site root.
pub fn short_link_router() -> Router<AppState> {
    short_links::router()
}
