//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use super::follow::author_id_subquery;
use super::write_error;

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by access token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user holding either the username or the email.
    pub async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Email.eq(email)),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user. A taken username or email surfaces as
    /// [`AppError::Conflict`].
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(write_error)
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.update(self.db.as_ref()).await.map_err(write_error)
    }

    /// One page of users ordered by ID, with the total count.
    pub async fn list(&self, offset: u64, limit: u64) -> AppResult<(Vec<user::Model>, u64)> {
        let count = User::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let users = User::find()
            .order_by_asc(user::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((users, count))
    }

    /// One page of the authors `user_id` follows, ordered by ID, with the
    /// total count.
    pub async fn list_followed_by(
        &self,
        user_id: i32,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<user::Model>, u64)> {
        let query = User::find().filter(user::Column::Id.in_subquery(author_id_subquery(user_id)));

        let count = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let users = query
            .order_by_asc(user::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((users, count))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Set};

    fn create_test_user(id: i32, username: &str) -> user::Model {
        user::Model {
            id,
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            avatar: None,
            token: Some("test_token".to_string()),
            created_at: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user(1, "chef");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_id(1).await.unwrap().unwrap();

        assert_eq!(found.username, "chef");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id(9).await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_token() {
        let user = create_test_user(1, "chef");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_token("test_token").await.unwrap();

        assert_eq!(found.map(|u| u.id), Some(1));
    }

    #[tokio::test]
    async fn test_create_user() {
        let user = create_test_user(1, "chef");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let created = repo
            .create(user::ActiveModel {
                email: Set(user.email.clone()),
                username: Set(user.username.clone()),
                first_name: Set(user.first_name.clone()),
                last_name: Set(user.last_name.clone()),
                password: Set(user.password.clone()),
                token: Set(user.token.clone()),
                created_at: Set(user.created_at),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.email, "chef@example.com");
    }

    #[tokio::test]
    async fn test_list() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(2)]])
                .append_query_results([[create_test_user(1, "a"), create_test_user(2, "b")]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let (users, count) = repo.list(0, 6).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_list_followed_by() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[create_test_user(2, "author")]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let (authors, count) = repo.list_followed_by(1, 0, 6).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(authors[0].username, "author");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = create_test_user(1, "chef");
        assert_eq!(user.display_name(), "Test User");

        user.first_name = " ".to_string();
        user.last_name = String::new();
        assert_eq!(user.display_name(), "chef");
    }
}
