//! Favorite and shopping cart toggles.

use foodgram_common::{AppError, AppResult};
use foodgram_db::{
    entities::recipe,
    repositories::{MarkerKind, RecipeMarkerRepository, RecipeRepository},
};

/// Adds and removes per-user marker rows on recipes.
#[derive(Clone)]
pub struct RecipeMarkerService {
    marker_repo: RecipeMarkerRepository,
    recipe_repo: RecipeRepository,
}

impl RecipeMarkerService {
    /// Create a new recipe marker service.
    #[must_use]
    pub const fn new(marker_repo: RecipeMarkerRepository, recipe_repo: RecipeRepository) -> Self {
        Self {
            marker_repo,
            recipe_repo,
        }
    }

    /// Mark a recipe. Returns the recipe for its short summary.
    ///
    /// An existing marker is a conflict; so is losing an insert race to a
    /// concurrent request for the same pair.
    pub async fn add(
        &self,
        kind: MarkerKind,
        user_id: i32,
        recipe_id: i32,
    ) -> AppResult<recipe::Model> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;

        if self.marker_repo.exists(kind, user_id, recipe_id).await? {
            return Err(already_marked(kind, &recipe));
        }

        match self.marker_repo.create(kind, user_id, recipe_id).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => return Err(already_marked(kind, &recipe)),
            Err(e) => return Err(e),
        }

        tracing::debug!(user_id, recipe_id, relation = kind.label(), "Marked recipe");
        Ok(recipe)
    }

    /// Unmark a recipe. Removing an absent marker is a conflict, not a 404.
    pub async fn remove(&self, kind: MarkerKind, user_id: i32, recipe_id: i32) -> AppResult<()> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;

        let removed = self.marker_repo.delete(kind, user_id, recipe_id).await?;
        if removed == 0 {
            return Err(AppError::Conflict(format!(
                "Recipe \"{}\" is not in {}.",
                recipe.name,
                kind.label()
            )));
        }

        tracing::debug!(user_id, recipe_id, relation = kind.label(), "Unmarked recipe");
        Ok(())
    }
}

fn already_marked(kind: MarkerKind, recipe: &recipe::Model) -> AppError {
    AppError::Conflict(format!(
        "Recipe \"{}\" is already in {}.",
        recipe.name,
        kind.label()
    ))
}
