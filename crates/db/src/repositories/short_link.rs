//! Short link repository.

use std::sync::Arc;

use crate::entities::{ShortLink, short_link};
use foodgram_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::write_error;

/// Short link repository for database operations.
#[derive(Clone)]
pub struct ShortLinkRepository {
    db: Arc<DatabaseConnection>,
}

impl ShortLinkRepository {
    /// Create a new short link repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the short link of a recipe.
    pub async fn find_by_recipe(&self, recipe_id: i32) -> AppResult<Option<short_link::Model>> {
        ShortLink::find()
            .filter(short_link::Column::RecipeId.eq(recipe_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a short link by code.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<short_link::Model>> {
        ShortLink::find()
            .filter(short_link::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a code is already taken.
    pub async fn code_exists(&self, code: &str) -> AppResult<bool> {
        Ok(self.find_by_code(code).await?.is_some())
    }

    /// Persist a code for a recipe. A taken code or an already linked recipe
    /// surfaces as [`AppError::Conflict`].
    pub async fn create(&self, recipe_id: i32, code: &str) -> AppResult<short_link::Model> {
        short_link::ActiveModel {
            recipe_id: Set(recipe_id),
            code: Set(code.to_string()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(write_error)
    }
}
