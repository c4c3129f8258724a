//! Database entities.

#![allow(missing_docs)]

pub mod favorite_recipe;
pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod shopping_cart_item;
pub mod short_link;
pub mod user;

pub use favorite_recipe::Entity as FavoriteRecipe;
pub use follow::Entity as Follow;
pub use ingredient::Entity as Ingredient;
pub use recipe::Entity as Recipe;
pub use recipe_ingredient::Entity as RecipeIngredient;
pub use shopping_cart_item::Entity as ShoppingCartItem;
pub use short_link::Entity as ShortLink;
pub use user::Entity as User;
