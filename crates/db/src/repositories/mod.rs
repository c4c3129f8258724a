//! Repositories wrapping database access per aggregate.

mod follow;
mod ingredient;
mod recipe;
mod recipe_ingredient;
mod recipe_marker;
mod short_link;
mod user;

pub use follow::FollowRepository;
pub use ingredient::IngredientRepository;
pub use recipe::{RecipeFilter, RecipeRepository};
pub use recipe_ingredient::{IngredientLine, RecipeIngredientRepository};
pub use recipe_marker::{MarkerKind, RecipeMarkerRepository};
pub use short_link::ShortLinkRepository;
pub use user::UserRepository;

use foodgram_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map an insert/update failure, surfacing unique violations as conflicts.
pub(crate) fn write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(err.to_string()),
    }
}
