//! Ingredient repository.

use std::sync::Arc;

use crate::entities::{Ingredient, ingredient};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::{Expr, Func},
};

use super::write_error;

/// Ingredient repository for database operations.
#[derive(Clone)]
pub struct IngredientRepository {
    db: Arc<DatabaseConnection>,
}

impl IngredientRepository {
    /// Create a new ingredient repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an ingredient by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<ingredient::Model>> {
        Ingredient::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an ingredient by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<ingredient::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ingredient {id}")))
    }

    /// Find ingredients by IDs.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<ingredient::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Ingredient::find()
            .filter(ingredient::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List ingredients ordered by name, optionally filtered by a
    /// case-insensitive name prefix.
    pub async fn search(&self, name_prefix: Option<&str>) -> AppResult<Vec<ingredient::Model>> {
        let mut query = Ingredient::find();

        if let Some(prefix) = name_prefix.map(str::trim).filter(|p| !p.is_empty()) {
            let pattern = format!(
                "{}%",
                prefix
                    .to_lowercase()
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_")
            );
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(ingredient::Column::Name))).like(pattern),
            );
        }

        query
            .order_by_asc(ingredient::Column::Name)
            .order_by_asc(ingredient::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an ingredient by its exact (name, unit) pair.
    pub async fn find_by_name_and_unit(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> AppResult<Option<ingredient::Model>> {
        Ingredient::find()
            .filter(ingredient::Column::Name.eq(name))
            .filter(ingredient::Column::MeasurementUnit.eq(measurement_unit))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new ingredient.
    pub async fn create(&self, model: ingredient::ActiveModel) -> AppResult<ingredient::Model> {
        model.insert(self.db.as_ref()).await.map_err(write_error)
    }
}
