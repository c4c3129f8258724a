//! Favorite and shopping cart marker repository.
//!
//! Both relations share one shape (user, recipe, created_at) and one
//! contract, so a single repository serves them and the caller names the
//! relation with [`MarkerKind`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{FavoriteRecipe, ShoppingCartItem, favorite_recipe, shopping_cart_item};
use chrono::Utc;
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set, prelude::DateTimeWithTimeZone,
    sea_query::SelectStatement,
};

use super::write_error;

/// Per-user marker relation on recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// Recipe is in the user's favorites.
    Favorite,
    /// Recipe is in the user's shopping cart.
    ShoppingCart,
}

impl MarkerKind {
    /// Human-readable relation name used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::ShoppingCart => "shopping cart",
        }
    }
}

/// Recipe marker repository for database operations.
#[derive(Clone)]
pub struct RecipeMarkerRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeMarkerRepository {
    /// Create a new recipe marker repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check if the user has marked the recipe.
    pub async fn exists(&self, kind: MarkerKind, user_id: i32, recipe_id: i32) -> AppResult<bool> {
        let db = self.db.as_ref();
        let found: Result<bool, DbErr> = match kind {
            MarkerKind::Favorite => FavoriteRecipe::find()
                .filter(favorite_recipe::Column::UserId.eq(user_id))
                .filter(favorite_recipe::Column::RecipeId.eq(recipe_id))
                .one(db)
                .await
                .map(|m| m.is_some()),
            MarkerKind::ShoppingCart => ShoppingCartItem::find()
                .filter(shopping_cart_item::Column::UserId.eq(user_id))
                .filter(shopping_cart_item::Column::RecipeId.eq(recipe_id))
                .one(db)
                .await
                .map(|m| m.is_some()),
        };
        found.map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a marker row. A duplicate surfaces as [`AppError::Conflict`].
    pub async fn create(&self, kind: MarkerKind, user_id: i32, recipe_id: i32) -> AppResult<()> {
        let db = self.db.as_ref();
        let now: DateTimeWithTimeZone = Utc::now().into();
        match kind {
            MarkerKind::Favorite => favorite_recipe::ActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await
            .map(|_| ()),
            MarkerKind::ShoppingCart => shopping_cart_item::ActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await
            .map(|_| ()),
        }
        .map_err(write_error)
    }

    /// Delete a marker row. Returns the number of rows removed.
    pub async fn delete(&self, kind: MarkerKind, user_id: i32, recipe_id: i32) -> AppResult<u64> {
        let db = self.db.as_ref();
        let result = match kind {
            MarkerKind::Favorite => {
                FavoriteRecipe::delete_many()
                    .filter(favorite_recipe::Column::UserId.eq(user_id))
                    .filter(favorite_recipe::Column::RecipeId.eq(recipe_id))
                    .exec(db)
                    .await
            }
            MarkerKind::ShoppingCart => {
                ShoppingCartItem::delete_many()
                    .filter(shopping_cart_item::Column::UserId.eq(user_id))
                    .filter(shopping_cart_item::Column::RecipeId.eq(recipe_id))
                    .exec(db)
                    .await
            }
        };
        result
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Recipe IDs the user has marked, in marking order.
    pub async fn recipe_ids(&self, kind: MarkerKind, user_id: i32) -> AppResult<Vec<i32>> {
        let db = self.db.as_ref();
        let ids: Result<Vec<i32>, DbErr> = match kind {
            MarkerKind::Favorite => {
                FavoriteRecipe::find()
                    .filter(favorite_recipe::Column::UserId.eq(user_id))
                    .order_by_asc(favorite_recipe::Column::Id)
                    .all(db)
                    .await
                    .map(|rows| rows.into_iter().map(|m| m.recipe_id).collect())
            }
            MarkerKind::ShoppingCart => {
                ShoppingCartItem::find()
                    .filter(shopping_cart_item::Column::UserId.eq(user_id))
                    .order_by_asc(shopping_cart_item::Column::Id)
                    .all(db)
                    .await
                    .map(|rows| rows.into_iter().map(|m| m.recipe_id).collect())
            }
        };
        ids.map_err(|e| AppError::Database(e.to_string()))
    }

    /// Subset of `recipe_ids` the user has marked.
    pub async fn marked_among(
        &self,
        kind: MarkerKind,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> AppResult<HashSet<i32>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let db = self.db.as_ref();
        let marked: Result<HashSet<i32>, DbErr> = match kind {
            MarkerKind::Favorite => FavoriteRecipe::find()
                .filter(favorite_recipe::Column::UserId.eq(user_id))
                .filter(favorite_recipe::Column::RecipeId.is_in(recipe_ids.to_vec()))
                .all(db)
                .await
                .map(|rows| rows.into_iter().map(|m| m.recipe_id).collect()),
            MarkerKind::ShoppingCart => ShoppingCartItem::find()
                .filter(shopping_cart_item::Column::UserId.eq(user_id))
                .filter(shopping_cart_item::Column::RecipeId.is_in(recipe_ids.to_vec()))
                .all(db)
                .await
                .map(|rows| rows.into_iter().map(|m| m.recipe_id).collect()),
        };
        marked.map_err(|e| AppError::Database(e.to_string()))
    }
}

/// `SELECT recipe_id FROM <marker table> WHERE user_id = ?`, for use in
/// `IN (...)` recipe filters.
#[must_use]
pub(crate) fn recipe_id_subquery(kind: MarkerKind, user_id: i32) -> SelectStatement {
    match kind {
        MarkerKind::Favorite => FavoriteRecipe::find()
            .select_only()
            .column(favorite_recipe::Column::RecipeId)
            .filter(favorite_recipe::Column::UserId.eq(user_id))
            .into_query(),
        MarkerKind::ShoppingCart => ShoppingCartItem::find()
            .select_only()
            .column(shopping_cart_item::Column::RecipeId)
            .filter(shopping_cart_item::Column::UserId.eq(user_id))
            .into_query(),
    }
}
