//! Ingredient catalog endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use foodgram_common::AppResult;
use serde::Deserialize;

use crate::{middleware::AppState, response::IngredientResponse};

/// `?name=` prefix filter.
#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

/// Search the catalog. Not paginated.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> AppResult<Json<Vec<IngredientResponse>>> {
    let ingredients = state
        .ingredient_service
        .search(query.name.as_deref())
        .await?;

    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<IngredientResponse>> {
    let ingredient = state.ingredient_service.get(id).await?;
    Ok(Json(ingredient.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients/", get(list))
        .route("/ingredients/{id}/", get(retrieve))
}
