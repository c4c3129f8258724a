//! Short-link redirect.

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header::LOCATION},
    response::IntoResponse,
    routing::get,
};
use foodgram_common::AppResult;

use crate::middleware::AppState;

/// Redirect `/s/{code}` to the recipe page with a 302.
async fn redirect(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let recipe_id = state.short_link_service.resolve(&code).await?;
    Ok((StatusCode::FOUND, [(LOCATION, format!("/recipes/{recipe_id}"))]))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/s/{code}", get(redirect))
}
