//! Recipe ingredient line repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Ingredient, RecipeIngredient, ingredient, recipe_ingredient};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

/// Ingredient line joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLine {
    /// Recipe the line belongs to.
    pub recipe_id: i32,
    /// Catalog ingredient ID.
    pub ingredient_id: i32,
    /// Ingredient name as stored in the catalog.
    pub name: String,
    /// Measurement unit.
    pub measurement_unit: String,
    /// Amount in `measurement_unit`.
    pub amount: i32,
}

/// Recipe ingredient repository for database operations.
#[derive(Clone)]
pub struct RecipeIngredientRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeIngredientRepository {
    /// Create a new recipe ingredient repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Ingredient lines of one recipe, in insertion order.
    pub async fn find_by_recipe(&self, recipe_id: i32) -> AppResult<Vec<IngredientLine>> {
        self.find_by_recipes(&[recipe_id]).await
    }

    /// Ingredient lines of several recipes, ordered by line ID.
    pub async fn find_by_recipes(&self, recipe_ids: &[i32]) -> AppResult<Vec<IngredientLine>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = RecipeIngredient::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .order_by_asc(recipe_ingredient::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Ok(vec![]);
        }

        let mut ingredient_ids: Vec<i32> = rows.iter().map(|r| r.ingredient_id).collect();
        ingredient_ids.sort_unstable();
        ingredient_ids.dedup();

        let catalog: HashMap<i32, ingredient::Model> = Ingredient::find()
            .filter(ingredient::Column::Id.is_in(ingredient_ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                catalog.get(&row.ingredient_id).map(|i| IngredientLine {
                    recipe_id: row.recipe_id,
                    ingredient_id: i.id,
                    name: i.name.clone(),
                    measurement_unit: i.measurement_unit.clone(),
                    amount: row.amount,
                })
            })
            .collect())
    }
}

/// Insert `(ingredient_id, amount)` lines for a recipe on `conn`.
pub(crate) async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    recipe_id: i32,
    lines: &[(i32, i32)],
) -> Result<(), DbErr> {
    if lines.is_empty() {
        return Ok(());
    }

    let models = lines
        .iter()
        .map(|&(ingredient_id, amount)| recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(ingredient_id),
            amount: Set(amount),
            ..Default::default()
        });

    RecipeIngredient::insert_many(models)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Remove every line of a recipe on `conn`.
pub(crate) async fn delete_lines<C: ConnectionTrait>(conn: &C, recipe_id: i32) -> Result<(), DbErr> {
    RecipeIngredient::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn line(id: i32, recipe_id: i32, ingredient_id: i32, amount: i32) -> recipe_ingredient::Model {
        recipe_ingredient::Model {
            id,
            recipe_id,
            ingredient_id,
            amount,
        }
    }

    fn ingredient(id: i32, name: &str, unit: &str) -> ingredient::Model {
        ingredient::Model {
            id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_by_recipes_joins_catalog() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[line(1, 10, 100, 200), line(2, 11, 100, 100)]])
                .append_query_results([[ingredient(100, "Flour", "g")]])
                .into_connection(),
        );

        let repo = RecipeIngredientRepository::new(db);
        let lines = repo.find_by_recipes(&[10, 11]).await.unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].recipe_id, 10);
        assert_eq!(lines[0].name, "Flour");
        assert_eq!(lines[1].amount, 100);
    }

    #[tokio::test]
    async fn test_find_by_recipes_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<recipe_ingredient::Model>::new()])
                .into_connection(),
        );

        let repo = RecipeIngredientRepository::new(db);
        assert!(repo.find_by_recipe(10).await.unwrap().is_empty());
    }
}
