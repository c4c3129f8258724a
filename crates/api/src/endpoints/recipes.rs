//! Recipe endpoints, including favorites, the shopping cart and short links.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use foodgram_common::AppResult;
use foodgram_core::{RecipeInput, ShoppingList};
use foodgram_db::repositories::{MarkerKind, RecipeFilter};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    pagination::{Page, PageQuery},
    response::{RecipeResponse, RecipeShortResponse, ShortLinkResponse},
};

/// Recipe list filters.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub author: Option<i32>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

impl RecipeListQuery {
    fn filter(&self) -> RecipeFilter {
        RecipeFilter {
            author_id: self.author,
            is_favorited: self.is_favorited.as_deref().and_then(parse_flag),
            is_in_shopping_cart: self.is_in_shopping_cart.as_deref().and_then(parse_flag),
        }
    }
}

/// `1`/`true` and `0`/`false`; anything else disables the filter.
fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(query): Query<RecipeListQuery>,
) -> AppResult<Json<Page<RecipeResponse>>> {
    let params = page.params(&state.pagination)?;
    let (recipes, count) = state
        .recipe_service
        .list(viewer.id(), query.filter(), params.offset(), params.limit)
        .await?;

    let results = recipes
        .into_iter()
        .map(|r| RecipeResponse::new(r, &state))
        .collect();
    Ok(Json(Page::new(
        results,
        count,
        params,
        &state.base_url,
        &uri,
    )?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<RecipeInput>,
) -> AppResult<(StatusCode, Json<RecipeResponse>)> {
    let details = state.recipe_service.create(&user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::new(details, &state)),
    ))
}

async fn retrieve(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RecipeResponse>> {
    let details = state.recipe_service.get(viewer.id(), id).await?;
    Ok(Json(RecipeResponse::new(details, &state)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    Json(input): Json<RecipeInput>,
) -> AppResult<Json<RecipeResponse>> {
    let details = state.recipe_service.update(&user, id, input).await?;
    Ok(Json(RecipeResponse::new(details, &state)))
}

async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.recipe_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ShortLinkResponse>> {
    let code = state.short_link_service.get_or_create(id).await?;
    Ok(Json(ShortLinkResponse {
        short_link: state.short_link_url(&code),
    }))
}

async fn add_marker(
    state: &AppState,
    kind: MarkerKind,
    user_id: i32,
    recipe_id: i32,
) -> AppResult<(StatusCode, Json<RecipeShortResponse>)> {
    let recipe = state
        .recipe_marker_service
        .add(kind, user_id, recipe_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeShortResponse::new(recipe, state)),
    ))
}

async fn remove_marker(
    state: &AppState,
    kind: MarkerKind,
    user_id: i32,
    recipe_id: i32,
) -> AppResult<StatusCode> {
    state
        .recipe_marker_service
        .remove(kind, user_id, recipe_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<RecipeShortResponse>)> {
    add_marker(&state, MarkerKind::Favorite, user.id, id).await
}

async fn unfavorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    remove_marker(&state, MarkerKind::Favorite, user.id, id).await
}

async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<RecipeShortResponse>)> {
    add_marker(&state, MarkerKind::ShoppingCart, user.id, id).await
}

async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    remove_marker(&state, MarkerKind::ShoppingCart, user.id, id).await
}

/// Plain-text shopping list as a file download.
async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<impl IntoResponse> {
    let list = state.shopping_list_service.build(user.id).await?;

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ShoppingList::FILE_NAME),
            ),
        ],
        list.render(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list).post(create))
        .route(
            "/recipes/download_shopping_cart/",
            get(download_shopping_cart),
        )
        .route(
            "/recipes/{id}/",
            get(retrieve).patch(update).delete(delete),
        )
        .route("/recipes/{id}/get-link/", get(get_link))
        .route("/recipes/{id}/favorite/", post(favorite).delete(unfavorite))
        .route(
            "/recipes/{id}/shopping_cart/",
            post(add_to_cart).delete(remove_from_cart),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_filter_from_query() {
        let query = RecipeListQuery {
            author: Some(3),
            is_favorited: Some("1".to_string()),
            is_in_shopping_cart: None,
        };
        let filter = query.filter();

        assert_eq!(filter.author_id, Some(3));
        assert_eq!(filter.is_favorited, Some(true));
        assert_eq!(filter.is_in_shopping_cart, None);
    }
}
