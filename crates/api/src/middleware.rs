//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use foodgram_common::{StorageBackend, config::PaginationConfig};
use foodgram_core::{
    FollowService, IngredientService, RecipeMarkerService, RecipeService, ShoppingListService,
    ShortLinkService, UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub ingredient_service: IngredientService,
    pub recipe_service: RecipeService,
    pub recipe_marker_service: RecipeMarkerService,
    pub follow_service: FollowService,
    pub shopping_list_service: ShoppingListService,
    pub short_link_service: ShortLinkService,
    pub storage: Arc<dyn StorageBackend>,
    /// Public URL of the site, without a trailing slash.
    pub base_url: String,
    pub pagination: PaginationConfig,
}

impl AppState {
    /// Absolute URL of a stored file.
    #[must_use]
    pub fn file_url(&self, key: &str) -> String {
        let url = self.storage.public_url(key);
        if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            url
        }
    }

    /// Public short-link URL for a code.
    #[must_use]
    pub fn short_link_url(&self, code: &str) -> String {
        format!("{}/s/{code}", self.base_url)
    }
}

/// Authentication middleware.
///
/// Accepts `Authorization: Token <key>` and `Authorization: Bearer <key>`.
/// A missing or unknown key leaves the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str
            .strip_prefix("Token ")
            .or_else(|| auth_str.strip_prefix("Bearer "))
    {
        match state.user_service.authenticate(token.trim()).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => tracing::debug!("Unknown access token"),
            Err(e) => tracing::warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
