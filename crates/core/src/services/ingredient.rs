//! Ingredient catalog service.

use foodgram_common::AppResult;
use foodgram_db::{entities::ingredient, repositories::IngredientRepository};

/// Read-only access to the ingredient catalog.
#[derive(Clone)]
pub struct IngredientService {
    ingredient_repo: IngredientRepository,
}

impl IngredientService {
    /// Create a new ingredient service.
    #[must_use]
    pub const fn new(ingredient_repo: IngredientRepository) -> Self {
        Self { ingredient_repo }
    }

    /// All ingredients ordered by name, narrowed to a case-insensitive name
    /// prefix when one is given.
    pub async fn search(&self, name: Option<&str>) -> AppResult<Vec<ingredient::Model>> {
        self.ingredient_repo.search(name).await
    }

    /// Get an ingredient by ID.
    pub async fn get(&self, id: i32) -> AppResult<ingredient::Model> {
        self.ingredient_repo.get_by_id(id).await
    }
}
