//! Recipe short links.

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::repositories::{RecipeRepository, ShortLinkRepository};

/// Attempts before `get_or_create` stops with an internal error. With 62^6
/// codes a collision streak this long means the store keeps rejecting
/// inserts, not that the code space is exhausted.
const MAX_ATTEMPTS: usize = 16;

/// Issues and resolves stable short codes for recipes.
#[derive(Clone)]
pub struct ShortLinkService {
    short_link_repo: ShortLinkRepository,
    recipe_repo: RecipeRepository,
    id_gen: IdGenerator,
}

impl ShortLinkService {
    /// Create a new short link service.
    #[must_use]
    pub const fn new(short_link_repo: ShortLinkRepository, recipe_repo: RecipeRepository) -> Self {
        Self {
            short_link_repo,
            recipe_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Return the code of a recipe, creating one on first request.
    ///
    /// A recipe keeps the same code for its lifetime. Concurrent first
    /// requests race on the unique recipe index; the loser re-reads the
    /// winner's code. Taken codes are redrawn up to [`MAX_ATTEMPTS`] times,
    /// after which the call fails instead of retrying forever.
    pub async fn get_or_create(&self, recipe_id: i32) -> AppResult<String> {
        self.recipe_repo.get_by_id(recipe_id).await?;

        for _ in 0..MAX_ATTEMPTS {
            if let Some(link) = self.short_link_repo.find_by_recipe(recipe_id).await? {
                return Ok(link.code);
            }

            let code = self.id_gen.generate_short_code();
            if self.short_link_repo.code_exists(&code).await? {
                tracing::debug!(code = %code, "Short code taken, regenerating");
                continue;
            }

            match self.short_link_repo.create(recipe_id, &code).await {
                Ok(link) => {
                    tracing::info!(recipe_id, code = %link.code, "Created short link");
                    return Ok(link.code);
                }
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(recipe_id, "Short link insert raced, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(format!(
            "Could not allocate a short link for recipe {recipe_id}"
        )))
    }

    /// Resolve a code to its recipe id.
    pub async fn resolve(&self, code: &str) -> AppResult<i32> {
        self.short_link_repo
            .find_by_code(code)
            .await?
            .map(|link| link.recipe_id)
            .ok_or_else(|| AppError::NotFound(format!("Short link {code}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foodgram_common::SHORT_CODE_LENGTH;
    use foodgram_db::entities::{recipe, short_link};
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, RuntimeErr};
    use std::sync::Arc;

    fn recipe_db(found: bool) -> Arc<DatabaseConnection> {
        let rows: Vec<recipe::Model> = if found {
            vec![recipe::Model {
                id: 7,
                author_id: 1,
                name: "Pie".to_string(),
                image: "recipes/images/pie.png".to_string(),
                text: "Bake.".to_string(),
                cooking_time: 45,
                pub_date: Utc::now().into(),
            }]
        } else {
            vec![]
        };
        Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        )
    }

    fn link(recipe_id: i32, code: &str) -> short_link::Model {
        short_link::Model {
            id: 1,
            recipe_id,
            code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_existing_link_is_stable() {
        let link_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[link(7, "aB3xY9")]])
                .into_connection(),
        );
        let service = ShortLinkService::new(
            ShortLinkRepository::new(link_db),
            RecipeRepository::new(recipe_db(true)),
        );

        assert_eq!(service.get_or_create(7).await.unwrap(), "aB3xY9");
    }

    #[tokio::test]
    async fn test_creates_link_on_first_request() {
        let link_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<short_link::Model>::new()])
                .append_query_results([Vec::<short_link::Model>::new()])
                .append_query_results([[link(7, "Zq81Lm")]])
                .into_connection(),
        );
        let service = ShortLinkService::new(
            ShortLinkRepository::new(link_db),
            RecipeRepository::new(recipe_db(true)),
        );

        let code = service.get_or_create(7).await.unwrap();

        assert_eq!(code.len(), SHORT_CODE_LENGTH);
    }

    #[tokio::test]
    async fn test_insert_failure_propagates() {
        let link_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<short_link::Model>::new()])
                .append_query_results([Vec::<short_link::Model>::new()])
                .append_query_errors([DbErr::Query(RuntimeErr::Internal(
                    "connection reset".to_string(),
                ))])
                .into_connection(),
        );
        let service = ShortLinkService::new(
            ShortLinkRepository::new(link_db),
            RecipeRepository::new(recipe_db(true)),
        );

        let result = service.get_or_create(7).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut mock = MockDatabase::new(DatabaseBackend::Postgres);
        for _ in 0..MAX_ATTEMPTS {
            // No link for the recipe yet, and every drawn code is taken.
            mock = mock
                .append_query_results([Vec::<short_link::Model>::new()])
                .append_query_results([[link(3, "taken0")]]);
        }
        let service = ShortLinkService::new(
            ShortLinkRepository::new(Arc::new(mock.into_connection())),
            RecipeRepository::new(recipe_db(true)),
        );

        let result = service.get_or_create(7).await;

        assert!(matches!(result, Err(AppError::Internal(msg)) if msg.contains("recipe 7")));
    }

    #[tokio::test]
    async fn test_missing_recipe_is_not_found() {
        let link_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = ShortLinkService::new(
            ShortLinkRepository::new(link_db),
            RecipeRepository::new(recipe_db(false)),
        );

        let result = service.get_or_create(404).await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve() {
        let link_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[link(7, "aB3xY9")]])
                .append_query_results([Vec::<short_link::Model>::new()])
                .into_connection(),
        );
        let service = ShortLinkService::new(
            ShortLinkRepository::new(link_db),
            RecipeRepository::new(recipe_db(false)),
        );

        assert_eq!(service.resolve("aB3xY9").await.unwrap(), 7);
        assert!(matches!(
            service.resolve("nope00").await,
            Err(AppError::NotFound(_))
        ));
    }
}
