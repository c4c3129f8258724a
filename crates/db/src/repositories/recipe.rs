//! Recipe repository.

use std::sync::Arc;

use crate::entities::{Recipe, recipe};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};

use super::recipe_ingredient::{delete_lines, insert_lines};
use super::recipe_marker::{MarkerKind, recipe_id_subquery};
use super::write_error;

/// Recipe list filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Only recipes by this author.
    pub author_id: Option<i32>,
    /// `Some(true)`: only favorited by the viewer; `Some(false)`: only not.
    pub is_favorited: Option<bool>,
    /// `Some(true)`: only in the viewer's cart; `Some(false)`: only not.
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    /// An anonymous viewer has no marked recipes, so asking for marked ones
    /// can only yield nothing.
    const fn matches_nothing_for(&self, viewer_id: Option<i32>) -> bool {
        viewer_id.is_none()
            && (matches!(self.is_favorited, Some(true))
                || matches!(self.is_in_shopping_cart, Some(true)))
    }

    fn apply(&self, mut query: Select<Recipe>, viewer_id: Option<i32>) -> Select<Recipe> {
        if let Some(author_id) = self.author_id {
            query = query.filter(recipe::Column::AuthorId.eq(author_id));
        }

        let Some(viewer_id) = viewer_id else {
            return query;
        };

        for (kind, wanted) in [
            (MarkerKind::Favorite, self.is_favorited),
            (MarkerKind::ShoppingCart, self.is_in_shopping_cart),
        ] {
            query = match wanted {
                Some(true) => query
                    .filter(recipe::Column::Id.in_subquery(recipe_id_subquery(kind, viewer_id))),
                Some(false) => query.filter(
                    recipe::Column::Id.not_in_subquery(recipe_id_subquery(kind, viewer_id)),
                ),
                None => query,
            };
        }

        query
    }
}

/// Recipe repository for database operations.
#[derive(Clone)]
pub struct RecipeRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeRepository {
    /// Create a new recipe repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a recipe by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<recipe::Model>> {
        Recipe::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a recipe by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<recipe::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))
    }

    /// Find recipes by IDs, newest first.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<recipe::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Recipe::find()
            .filter(recipe::Column::Id.is_in(ids.to_vec()))
            .order_by_desc(recipe::Column::PubDate)
            .order_by_desc(recipe::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of recipes matching `filter` as seen by `viewer_id`, newest
    /// first, together with the total match count.
    pub async fn list(
        &self,
        filter: RecipeFilter,
        viewer_id: Option<i32>,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<recipe::Model>, u64)> {
        if filter.matches_nothing_for(viewer_id) {
            return Ok((vec![], 0));
        }

        let query = filter.apply(Recipe::find(), viewer_id);

        let count = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let recipes = query
            .order_by_desc(recipe::Column::PubDate)
            .order_by_desc(recipe::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((recipes, count))
    }

    /// Newest recipes of an author, optionally capped.
    pub async fn find_by_author(
        &self,
        author_id: i32,
        limit: Option<u64>,
    ) -> AppResult<Vec<recipe::Model>> {
        Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .order_by_desc(recipe::Column::PubDate)
            .order_by_desc(recipe::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count recipes of an author.
    pub async fn count_by_author(&self, author_id: i32) -> AppResult<u64> {
        Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a recipe and its `(ingredient_id, amount)` lines atomically.
    pub async fn create_with_ingredients(
        &self,
        model: recipe::ActiveModel,
        lines: &[(i32, i32)],
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let recipe = model.insert(&txn).await.map_err(write_error)?;
        insert_lines(&txn, recipe.id, lines)
            .await
            .map_err(write_error)?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(recipe)
    }

    /// Update a recipe and, when given, replace its lines atomically.
    pub async fn update_with_ingredients(
        &self,
        model: recipe::ActiveModel,
        lines: Option<&[(i32, i32)]>,
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let recipe = model.update(&txn).await.map_err(write_error)?;
        if let Some(lines) = lines {
            delete_lines(&txn, recipe.id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            insert_lines(&txn, recipe.id, lines)
                .await
                .map_err(write_error)?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(recipe)
    }

    /// Move the ID sequence past the highest stored ID. Needed after rows
    /// were inserted with explicit IDs.
    pub async fn sync_id_sequence(&self) -> AppResult<()> {
        self.db
            .execute_unprepared(
                "SELECT setval(pg_get_serial_sequence('recipe', 'id'), \
                 COALESCE((SELECT MAX(id) FROM recipe), 0) + 1, false)",
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a recipe. Lines, markers and the short link go with it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        Recipe::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait, Set};

    fn create_test_recipe(id: i32, author_id: i32, name: &str) -> recipe::Model {
        recipe::Model {
            id,
            author_id,
            name: name.to_string(),
            image: format!("recipes/images/{id}.png"),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            pub_date: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    fn sql(query: Select<Recipe>) -> String {
        query.build(DatabaseBackend::Postgres).to_string()
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<recipe::Model>::new()])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let result = repo.get_by_id(1).await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_returns_page_and_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(7)]])
                .append_query_results([[
                    create_test_recipe(2, 1, "Pancakes"),
                    create_test_recipe(1, 1, "Soup"),
                ]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let (recipes, count) = repo
            .list(RecipeFilter::default(), None, 0, 6)
            .await
            .unwrap();

        assert_eq!(count, 7);
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].name, "Pancakes");
    }

    #[tokio::test]
    async fn test_list_anonymous_marked_filter_is_empty() {
        // No query results queued: any query would fail.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = RecipeRepository::new(db);
        let filter = RecipeFilter {
            is_favorited: Some(true),
            ..Default::default()
        };
        let (recipes, count) = repo.list(filter, None, 0, 6).await.unwrap();

        assert!(recipes.is_empty());
        assert_eq!(count, 0);
    }

    #[test]
    fn test_filter_sql() {
        let filter = RecipeFilter {
            author_id: Some(3),
            is_favorited: Some(true),
            is_in_shopping_cart: Some(false),
        };
        let query = sql(filter.apply(Recipe::find(), Some(9)));

        assert!(query.contains("\"author_id\" = 3"));
        assert!(query.contains("IN (SELECT \"favorite_recipe\".\"recipe_id\""));
        assert!(query.contains("NOT IN (SELECT \"shopping_cart_item\".\"recipe_id\""));
    }

    #[test]
    fn test_filter_anonymous_unmarked_is_ignored() {
        let filter = RecipeFilter {
            is_favorited: Some(false),
            ..Default::default()
        };
        let query = sql(filter.apply(Recipe::find(), None));

        assert!(!query.contains("favorite_recipe"));
        assert!(!filter.matches_nothing_for(None));
    }

    #[tokio::test]
    async fn test_create_with_ingredients() {
        let recipe = create_test_recipe(5, 1, "Bread");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let created = repo
            .create_with_ingredients(
                recipe::ActiveModel {
                    author_id: Set(1),
                    name: Set("Bread".to_string()),
                    image: Set(recipe.image.clone()),
                    text: Set(recipe.text.clone()),
                    cooking_time: Set(30),
                    pub_date: Set(recipe.pub_date),
                    ..Default::default()
                },
                &[(1, 500), (2, 10)],
            )
            .await
            .unwrap();

        assert_eq!(created.id, 5);
    }

    #[tokio::test]
    async fn test_count_by_author() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(3)]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        assert_eq!(repo.count_by_author(1).await.unwrap(), 3);
    }
}
