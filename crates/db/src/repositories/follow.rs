//! Follow (subscription) repository.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{Follow, follow};
use chrono::Utc;
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
    QueryTrait, Set, sea_query::SelectStatement,
};

use super::write_error;

/// Follow repository for database operations.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follow edge by follower and author.
    pub async fn find_by_pair(
        &self,
        user_id: i32,
        author_id: i32,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if `user_id` follows `author_id`.
    pub async fn is_following(&self, user_id: i32, author_id: i32) -> AppResult<bool> {
        Ok(self.find_by_pair(user_id, author_id).await?.is_some())
    }

    /// Subset of `author_ids` followed by `user_id`.
    pub async fn followed_among(
        &self,
        user_id: i32,
        author_ids: &[i32],
    ) -> AppResult<HashSet<i32>> {
        if author_ids.is_empty() {
            return Ok(HashSet::new());
        }

        Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.is_in(author_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map(|rows| rows.into_iter().map(|f| f.author_id).collect())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a follow edge. A duplicate surfaces as [`AppError::Conflict`].
    pub async fn create(&self, user_id: i32, author_id: i32) -> AppResult<follow::Model> {
        follow::ActiveModel {
            user_id: Set(user_id),
            author_id: Set(author_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(write_error)
    }

    /// Delete a follow edge. Returns the number of rows removed.
    pub async fn delete_by_pair(&self, user_id: i32, author_id: i32) -> AppResult<u64> {
        Follow::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// `SELECT author_id FROM follow WHERE user_id = ?`.
#[must_use]
pub(crate) fn author_id_subquery(user_id: i32) -> SelectStatement {
    Follow::find()
        .select_only()
        .column(follow::Column::AuthorId)
        .filter(follow::Column::UserId.eq(user_id))
        .into_query()
}
