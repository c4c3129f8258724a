//! Subscription (follow) service.

use foodgram_common::{AppError, AppResult};
use foodgram_db::{
    entities::{recipe, user},
    repositories::{FollowRepository, RecipeRepository, UserRepository},
};

use super::user::UserView;

/// A followed author with a preview of their recipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    pub author: UserView,
    /// Newest recipes, capped by the caller's `recipes_limit`.
    pub recipes: Vec<recipe::Model>,
    /// Total number of recipes by the author.
    pub recipes_count: u64,
}

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    recipe_repo: RecipeRepository,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(
        follow_repo: FollowRepository,
        user_repo: UserRepository,
        recipe_repo: RecipeRepository,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            recipe_repo,
        }
    }

    /// Follow an author.
    pub async fn subscribe(
        &self,
        user_id: i32,
        author_id: i32,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        if user_id == author_id {
            return Err(AppError::Validation(
                "You cannot subscribe to yourself.".to_string(),
            ));
        }

        let author = self.user_repo.get_by_id(author_id).await?;

        if self.follow_repo.is_following(user_id, author_id).await? {
            return Err(already_following(&author));
        }

        match self.follow_repo.create(user_id, author_id).await {
            Ok(_) => {}
            Err(AppError::Conflict(_)) => return Err(already_following(&author)),
            Err(e) => return Err(e),
        }

        tracing::debug!(user_id, author_id, "Subscribed");
        self.preview(author, recipes_limit).await
    }

    /// Stop following an author. Not following is a conflict, not a 404.
    pub async fn unsubscribe(&self, user_id: i32, author_id: i32) -> AppResult<()> {
        let author = self.user_repo.get_by_id(author_id).await?;

        let removed = self.follow_repo.delete_by_pair(user_id, author_id).await?;
        if removed == 0 {
            return Err(AppError::Conflict(format!(
                "You are not subscribed to {}.",
                author.display_name()
            )));
        }

        tracing::debug!(user_id, author_id, "Unsubscribed");
        Ok(())
    }

    /// One page of the authors `user_id` follows, with the total count.
    pub async fn list(
        &self,
        user_id: i32,
        offset: u64,
        limit: u64,
        recipes_limit: Option<u64>,
    ) -> AppResult<(Vec<SubscriptionView>, u64)> {
        let (authors, count) = self
            .user_repo
            .list_followed_by(user_id, offset, limit)
            .await?;

        let mut views = Vec::with_capacity(authors.len());
        for author in authors {
            views.push(self.preview(author, recipes_limit).await?);
        }
        Ok((views, count))
    }

    async fn preview(
        &self,
        author: user::Model,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        let recipes = self
            .recipe_repo
            .find_by_author(author.id, recipes_limit)
            .await?;
        let recipes_count = self.recipe_repo.count_by_author(author.id).await?;

        Ok(SubscriptionView {
            author: UserView {
                user: author,
                is_subscribed: true,
            },
            recipes,
            recipes_count,
        })
    }
}

fn already_following(author: &user::Model) -> AppError {
    AppError::Conflict(format!(
        "You are already subscribed to {}.",
        author.display_name()
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::user::tests::create_test_user;
    use chrono::Utc;
    use foodgram_db::entities::follow;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    fn create_test_follow(user_id: i32, author_id: i32) -> follow::Model {
        follow::Model {
            id: 1,
            user_id,
            author_id,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_recipe(id: i32, author_id: i32) -> recipe::Model {
        recipe::Model {
            id,
            author_id,
            name: format!("Recipe {id}"),
            image: format!("recipes/images/{id}.png"),
            text: "Cook.".to_string(),
            cooking_time: 10,
            pub_date: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_self_subscribe_is_validation_error() {
        let service = FollowService::new(
            FollowRepository::new(empty_db()),
            UserRepository::new(empty_db()),
            RecipeRepository::new(empty_db()),
        );

        let result = service.subscribe(1, 1, None).await;

        match result {
            Err(err @ AppError::Validation(_)) => {
                assert_eq!(err.error_code(), "VALIDATION_ERROR");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscribe_missing_author_is_not_found() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = FollowService::new(
            FollowRepository::new(empty_db()),
            UserRepository::new(user_db),
            RecipeRepository::new(empty_db()),
        );

        let result = service.subscribe(1, 2, None).await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_subscribe_twice_is_conflict() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user(2, "author")]])
                .into_connection(),
        );
        let follow_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_follow(1, 2)]])
                .into_connection(),
        );
        let service = FollowService::new(
            FollowRepository::new(follow_db),
            UserRepository::new(user_db),
            RecipeRepository::new(empty_db()),
        );

        let result = service.subscribe(1, 2, None).await;

        match result {
            Err(err @ AppError::Conflict(_)) => {
                assert_eq!(err.error_code(), "CONFLICT");
                assert!(err.message().contains("Test User"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscribe_returns_preview() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user(2, "author")]])
                .into_connection(),
        );
        let follow_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follow::Model>::new()])
                .append_query_results([[create_test_follow(1, 2)]])
                .into_connection(),
        );
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_recipe(3, 2)]])
                .append_query_results([[count_row(4)]])
                .into_connection(),
        );
        let service = FollowService::new(
            FollowRepository::new(follow_db),
            UserRepository::new(user_db),
            RecipeRepository::new(recipe_db),
        );

        let view = service.subscribe(1, 2, Some(1)).await.unwrap();

        assert!(view.author.is_subscribed);
        assert_eq!(view.recipes.len(), 1);
        assert_eq!(view.recipes_count, 4);
    }

    #[tokio::test]
    async fn test_unsubscribe_not_following_is_conflict() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user(2, "author")]])
                .into_connection(),
        );
        let follow_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let service = FollowService::new(
            FollowRepository::new(follow_db),
            UserRepository::new(user_db),
            RecipeRepository::new(empty_db()),
        );

        let result = service.unsubscribe(1, 2).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
