//! API response types.

use foodgram_core::{RecipeDetails, SubscriptionView, UserView};
use foodgram_db::{
    entities::{ingredient, recipe, user},
    repositories::IngredientLine,
};
use serde::Serialize;

use crate::middleware::AppState;

/// User representation.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserResponse {
    #[must_use]
    pub fn new(view: UserView, state: &AppState) -> Self {
        let user = view.user;
        Self {
            avatar: user.avatar.as_deref().map(|key| state.file_url(key)),
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed: view.is_subscribed,
        }
    }
}

/// Registration response. Carries no viewer-specific fields.
#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<user::Model> for CreatedUserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Avatar URL response.
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

/// Catalog ingredient.
#[derive(Debug, Serialize)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(ingredient: ingredient::Model) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

/// Ingredient line of a recipe. `id` is the catalog ingredient id.
#[derive(Debug, Serialize)]
pub struct RecipeIngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<IngredientLine> for RecipeIngredientResponse {
    fn from(line: IngredientLine) -> Self {
        Self {
            id: line.ingredient_id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        }
    }
}

/// Full recipe representation.
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i32,
    pub author: UserResponse,
    pub name: String,
    pub image: String,
    pub text: String,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeResponse {
    #[must_use]
    pub fn new(details: RecipeDetails, state: &AppState) -> Self {
        let recipe = details.recipe;
        Self {
            id: recipe.id,
            author: UserResponse::new(details.author, state),
            image: state.file_url(&recipe.image),
            name: recipe.name,
            text: recipe.text,
            ingredients: details.ingredients.into_iter().map(Into::into).collect(),
            cooking_time: recipe.cooking_time,
            is_favorited: details.is_favorited,
            is_in_shopping_cart: details.is_in_shopping_cart,
        }
    }
}

/// Short recipe summary used by markers and subscriptions.
#[derive(Debug, Serialize)]
pub struct RecipeShortResponse {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeShortResponse {
    #[must_use]
    pub fn new(recipe: recipe::Model, state: &AppState) -> Self {
        Self {
            id: recipe.id,
            image: state.file_url(&recipe.image),
            name: recipe.name,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// A followed author with a recipe preview.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: u64,
}

impl SubscriptionResponse {
    #[must_use]
    pub fn new(view: SubscriptionView, state: &AppState) -> Self {
        Self {
            user: UserResponse::new(view.author, state),
            recipes: view
                .recipes
                .into_iter()
                .map(|r| RecipeShortResponse::new(r, state))
                .collect(),
            recipes_count: view.recipes_count,
        }
    }
}

/// Short link of a recipe.
#[derive(Debug, Serialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}
