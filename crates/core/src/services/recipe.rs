//! Recipe service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use foodgram_common::{
    AppError, AppResult, StorageBackend, decode_data_url, generate_storage_key,
};
use foodgram_db::{
    entities::{recipe, user},
    repositories::{
        FollowRepository, IngredientLine, IngredientRepository, MarkerKind,
        RecipeFilter, RecipeIngredientRepository, RecipeMarkerRepository, RecipeRepository,
        UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::user::UserView;

/// Storage prefix for recipe images.
const IMAGE_PREFIX: &str = "recipes/images";

/// One ingredient line of a recipe write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    /// Catalog ingredient ID.
    pub id: i32,
    pub amount: i32,
}

/// Recipe create/update payload.
///
/// On create every field is required. On update `ingredients` is still
/// required while the remaining fields keep their stored value when absent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecipeInput {
    pub ingredients: Option<Vec<IngredientAmount>>,

    /// Base64 data URL.
    pub image: Option<String>,

    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,

    #[validate(length(min = 1))]
    pub text: Option<String>,

    #[validate(range(min = 1))]
    pub cooking_time: Option<i32>,
}

/// A recipe with everything its read representation needs for one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDetails {
    pub recipe: recipe::Model,
    pub author: UserView,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Recipe service for business logic.
#[derive(Clone)]
pub struct RecipeService {
    recipe_repo: RecipeRepository,
    line_repo: RecipeIngredientRepository,
    ingredient_repo: IngredientRepository,
    marker_repo: RecipeMarkerRepository,
    user_repo: UserRepository,
    follow_repo: FollowRepository,
    storage: Arc<dyn StorageBackend>,
}

impl RecipeService {
    /// Create a new recipe service.
    #[must_use]
    pub fn new(
        recipe_repo: RecipeRepository,
        line_repo: RecipeIngredientRepository,
        ingredient_repo: IngredientRepository,
        marker_repo: RecipeMarkerRepository,
        user_repo: UserRepository,
        follow_repo: FollowRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            recipe_repo,
            line_repo,
            ingredient_repo,
            marker_repo,
            user_repo,
            follow_repo,
            storage,
        }
    }

    /// Get a recipe as seen by `viewer_id`.
    pub async fn get(&self, viewer_id: Option<i32>, id: i32) -> AppResult<RecipeDetails> {
        let recipe = self.recipe_repo.get_by_id(id).await?;
        self.describe_one(viewer_id, recipe).await
    }

    /// One page of recipes matching `filter`, with the total count.
    pub async fn list(
        &self,
        viewer_id: Option<i32>,
        filter: RecipeFilter,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<RecipeDetails>, u64)> {
        let (recipes, count) = self
            .recipe_repo
            .list(filter, viewer_id, offset, limit)
            .await?;
        let details = self.describe(viewer_id, recipes).await?;
        Ok((details, count))
    }

    /// Create a recipe authored by `author`.
    pub async fn create(&self, author: &user::Model, input: RecipeInput) -> AppResult<RecipeDetails> {
        let lines = self.validate(&input).await?;

        let (Some(name), Some(text), Some(cooking_time)) =
            (input.name, input.text, input.cooking_time)
        else {
            return Err(AppError::Validation(
                "Fields name, text and cooking_time are required.".to_string(),
            ));
        };
        let image = input
            .image
            .ok_or_else(|| AppError::Validation("Image must not be empty.".to_string()))?;
        let image_key = self.store_image(&image).await?;

        let model = recipe::ActiveModel {
            author_id: Set(author.id),
            name: Set(name),
            image: Set(image_key.clone()),
            text: Set(text),
            cooking_time: Set(cooking_time),
            pub_date: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let recipe = match self.recipe_repo.create_with_ingredients(model, &lines).await {
            Ok(recipe) => recipe,
            Err(e) => {
                self.remove_file(&image_key).await;
                return Err(e);
            }
        };
        tracing::info!(recipe_id = recipe.id, author_id = author.id, "Created recipe");

        self.describe_one(Some(author.id), recipe).await
    }

    /// Update a recipe. Only its author may do so.
    pub async fn update(
        &self,
        user: &user::Model,
        recipe_id: i32,
        input: RecipeInput,
    ) -> AppResult<RecipeDetails> {
        let existing = self.get_owned(user, recipe_id).await?;
        let lines = self.validate(&input).await?;

        let new_image = match input.image.as_deref() {
            Some(data_url) => Some(self.store_image(data_url).await?),
            None => None,
        };
        let old_image = existing.image.clone();

        let mut model: recipe::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(text) = input.text {
            model.text = Set(text);
        }
        if let Some(cooking_time) = input.cooking_time {
            model.cooking_time = Set(cooking_time);
        }
        if let Some(key) = new_image.clone() {
            model.image = Set(key);
        }

        let recipe = match self
            .recipe_repo
            .update_with_ingredients(model, Some(&lines))
            .await
        {
            Ok(recipe) => recipe,
            Err(e) => {
                if let Some(key) = &new_image {
                    self.remove_file(key).await;
                }
                return Err(e);
            }
        };

        if new_image.is_some() {
            self.remove_file(&old_image).await;
        }

        self.describe_one(Some(user.id), recipe).await
    }

    /// Delete a recipe. Only its author may do so.
    pub async fn delete(&self, user: &user::Model, recipe_id: i32) -> AppResult<()> {
        let recipe = self.get_owned(user, recipe_id).await?;
        self.recipe_repo.delete(recipe.id).await?;
        tracing::info!(recipe_id = recipe.id, "Deleted recipe");
        self.remove_file(&recipe.image).await;
        Ok(())
    }

    /// Attach author, ingredient lines and viewer marks to each recipe.
    pub async fn describe(
        &self,
        viewer_id: Option<i32>,
        recipes: Vec<recipe::Model>,
    ) -> AppResult<Vec<RecipeDetails>> {
        if recipes.is_empty() {
            return Ok(vec![]);
        }

        let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
        let mut author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<i32, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut lines_by_recipe: HashMap<i32, Vec<IngredientLine>> = HashMap::new();
        for line in self.line_repo.find_by_recipes(&recipe_ids).await? {
            lines_by_recipe.entry(line.recipe_id).or_default().push(line);
        }

        let (followed, favorited, in_cart) = match viewer_id {
            Some(viewer_id) => (
                self.follow_repo
                    .followed_among(viewer_id, &author_ids)
                    .await?,
                self.marker_repo
                    .marked_among(MarkerKind::Favorite, viewer_id, &recipe_ids)
                    .await?,
                self.marker_repo
                    .marked_among(MarkerKind::ShoppingCart, viewer_id, &recipe_ids)
                    .await?,
            ),
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        Ok(recipes
            .into_iter()
            .filter_map(|recipe| {
                let author = authors.get(&recipe.author_id)?.clone();
                Some(RecipeDetails {
                    author: UserView {
                        is_subscribed: followed.contains(&author.id),
                        user: author,
                    },
                    ingredients: lines_by_recipe.remove(&recipe.id).unwrap_or_default(),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    recipe,
                })
            })
            .collect())
    }

    async fn describe_one(
        &self,
        viewer_id: Option<i32>,
        recipe: recipe::Model,
    ) -> AppResult<RecipeDetails> {
        let id = recipe.id;
        self.describe(viewer_id, vec![recipe])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Recipe {id} has no author")))
    }

    async fn get_owned(&self, user: &user::Model, recipe_id: i32) -> AppResult<recipe::Model> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;
        if recipe.author_id != user.id {
            return Err(AppError::Forbidden(
                "You can only change your own recipes.".to_string(),
            ));
        }
        Ok(recipe)
    }

    /// Check the payload and return its `(ingredient_id, amount)` lines.
    async fn validate(&self, input: &RecipeInput) -> AppResult<Vec<(i32, i32)>> {
        let ingredients = input
            .ingredients
            .as_deref()
            .ok_or_else(|| AppError::Validation("Ingredients must be provided.".to_string()))?;
        let lines = check_ingredient_lines(ingredients)?;

        let ids: Vec<i32> = lines.iter().map(|&(id, _)| id).collect();
        let known: HashSet<i32> = self
            .ingredient_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
            return Err(AppError::Validation(format!(
                "Ingredient {missing} does not exist."
            )));
        }

        input.validate()?;
        if matches!(input.image.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(AppError::Validation("Image must not be empty.".to_string()));
        }

        Ok(lines)
    }

    async fn store_image(&self, data_url: &str) -> AppResult<String> {
        let image = decode_data_url(data_url)?;
        let key = generate_storage_key(IMAGE_PREFIX, &image.extension);
        self.storage
            .upload(&key, &image.data, &image.content_type)
            .await?;
        Ok(key)
    }

    async fn remove_file(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete recipe image");
        }
    }
}

/// Reject empty, duplicated or non-positive ingredient lines.
fn check_ingredient_lines(ingredients: &[IngredientAmount]) -> AppResult<Vec<(i32, i32)>> {
    if ingredients.is_empty() {
        return Err(AppError::Validation(
            "A recipe needs at least one ingredient.".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for line in ingredients {
        if !seen.insert(line.id) {
            return Err(AppError::Validation(
                "An ingredient cannot be listed twice.".to_string(),
            ));
        }
        if line.amount < 1 {
            return Err(AppError::Validation(
                "Ingredient amount must be at least 1.".to_string(),
            ));
        }
    }

    Ok(ingredients.iter().map(|l| (l.id, l.amount)).collect())
}
