//! Business logic services.

#![allow(missing_docs)]

pub mod follow;
pub mod import;
pub mod ingredient;
pub mod recipe;
pub mod recipe_marker;
pub mod shopping_list;
pub mod short_link;
pub mod user;

pub use follow::{FollowService, SubscriptionView};
pub use import::{
    ImportReport, ImportService, IngredientRecord, RecipeLineRecord, RecipeRecord, UserRecord,
};
pub use ingredient::IngredientService;
pub use recipe::{IngredientAmount, RecipeDetails, RecipeInput, RecipeService};
pub use recipe_marker::RecipeMarkerService;
pub use shopping_list::{ProductTotal, ShoppingList, ShoppingListService};
pub use short_link::ShortLinkService;
pub use user::{CreateUserInput, UserService, UserView};
