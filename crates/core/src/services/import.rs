//! Bulk data loading for the import CLI.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset, Utc};
use foodgram_common::{AppResult, IdGenerator};
use foodgram_db::{
    entities::{ingredient, recipe, user},
    repositories::{IngredientRepository, RecipeRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;

use super::user::hash_password;

/// One row of an ingredient catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

/// One row of a user file. Only `email`, `username` and `password` are
/// required; incomplete rows are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// One row of a recipe file. Rows are keyed by `id`; an existing recipe
/// with the same ID is overwritten.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeRecord {
    pub id: i32,
    /// Author user ID.
    pub author: i32,
    pub name: String,
    /// Storage key of an image already present under the media root.
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub pub_date: Option<DateTime<FixedOffset>>,
}

/// One row of a recipe ingredient file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RecipeLineRecord {
    pub recipe: i32,
    pub ingredient: i32,
    pub amount: i32,
}

/// Outcome of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Loads catalog, user and recipe rows.
#[derive(Clone)]
pub struct ImportService {
    ingredient_repo: IngredientRepository,
    user_repo: UserRepository,
    recipe_repo: RecipeRepository,
    id_gen: IdGenerator,
}

impl ImportService {
    /// Create a new import service.
    #[must_use]
    pub const fn new(
        ingredient_repo: IngredientRepository,
        user_repo: UserRepository,
        recipe_repo: RecipeRepository,
    ) -> Self {
        Self {
            ingredient_repo,
            user_repo,
            recipe_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Insert catalog entries whose (name, unit) pair is not present yet.
    pub async fn import_ingredients(
        &self,
        records: Vec<IngredientRecord>,
    ) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        for record in records {
            let name = record.name.trim();
            let unit = record.measurement_unit.trim();
            if name.is_empty() || unit.is_empty() {
                tracing::warn!(name = %record.name, "Skipping ingredient with empty field");
                report.skipped += 1;
                continue;
            }

            if self
                .ingredient_repo
                .find_by_name_and_unit(name, unit)
                .await?
                .is_some()
            {
                report.skipped += 1;
                continue;
            }

            self.ingredient_repo
                .create(ingredient::ActiveModel {
                    name: Set(name.to_string()),
                    measurement_unit: Set(unit.to_string()),
                    ..Default::default()
                })
                .await?;
            report.inserted += 1;
        }

        tracing::info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "Imported ingredients"
        );
        Ok(report)
    }

    /// Create users with fresh tokens. The token of each created user is
    /// logged so operators can hand it out.
    pub async fn import_users(&self, records: Vec<UserRecord>) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        for record in records {
            let (Some(email), Some(username), Some(password)) = (
                non_empty(record.email),
                non_empty(record.username),
                non_empty(record.password),
            ) else {
                tracing::warn!("Skipping user row without email, username or password");
                report.skipped += 1;
                continue;
            };

            if self
                .user_repo
                .find_by_username_or_email(&username, &email)
                .await?
                .is_some()
            {
                tracing::warn!(username = %username, "User already exists, skipping");
                report.skipped += 1;
                continue;
            }

            let token = self.id_gen.generate_token();
            let created = self
                .user_repo
                .create(user::ActiveModel {
                    email: Set(email),
                    username: Set(username),
                    first_name: Set(record.first_name.unwrap_or_default()),
                    last_name: Set(record.last_name.unwrap_or_default()),
                    password: Set(hash_password(&password)?),
                    avatar: Set(None),
                    token: Set(Some(token.clone())),
                    created_at: Set(chrono::Utc::now().into()),
                    ..Default::default()
                })
                .await?;

            tracing::info!(username = %created.username, token = %token, "Created user");
            report.inserted += 1;
        }

        Ok(report)
    }

    /// Create or overwrite recipes by ID together with their ingredient
    /// lines. Recipes whose author is missing are skipped, as are lines
    /// pointing at unknown recipes or ingredients.
    pub async fn import_recipes(
        &self,
        recipes: Vec<RecipeRecord>,
        lines: Vec<RecipeLineRecord>,
    ) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        let mut ingredient_ids: Vec<i32> = lines.iter().map(|l| l.ingredient).collect();
        ingredient_ids.sort_unstable();
        ingredient_ids.dedup();
        let known_ingredients: HashSet<i32> = self
            .ingredient_repo
            .find_by_ids(&ingredient_ids)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        let recipe_ids: HashSet<i32> = recipes.iter().map(|r| r.id).collect();
        let lines_by_recipe = group_lines(lines, &recipe_ids, &known_ingredients);

        for record in recipes {
            if record.name.trim().is_empty() || record.cooking_time < 1 {
                tracing::warn!(recipe_id = record.id, "Skipping recipe with invalid fields");
                report.skipped += 1;
                continue;
            }

            if self.user_repo.find_by_id(record.author).await?.is_none() {
                tracing::warn!(
                    recipe_id = record.id,
                    author_id = record.author,
                    "Recipe author not found, skipping"
                );
                report.skipped += 1;
                continue;
            }

            let recipe_lines = lines_by_recipe
                .get(&record.id)
                .map_or(&[][..], Vec::as_slice);
            let exists = self.recipe_repo.find_by_id(record.id).await?.is_some();
            let model = recipe::ActiveModel {
                id: Set(record.id),
                author_id: Set(record.author),
                name: Set(record.name),
                image: Set(record.image),
                text: Set(record.text),
                cooking_time: Set(record.cooking_time),
                pub_date: Set(record.pub_date.unwrap_or_else(|| Utc::now().into())),
            };

            if exists {
                self.recipe_repo
                    .update_with_ingredients(model, Some(recipe_lines))
                    .await?;
                report.updated += 1;
            } else {
                self.recipe_repo
                    .create_with_ingredients(model, recipe_lines)
                    .await?;
                report.inserted += 1;
            }
        }

        if report.inserted > 0 {
            self.recipe_repo.sync_id_sequence().await?;
        }

        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            "Imported recipes"
        );
        Ok(report)
    }
}

/// `(ingredient_id, amount)` lines per recipe. Lines for recipes outside
/// the import, unknown ingredients, non-positive amounts and repeated
/// ingredients are dropped with a warning.
fn group_lines(
    lines: Vec<RecipeLineRecord>,
    recipe_ids: &HashSet<i32>,
    known_ingredients: &HashSet<i32>,
) -> HashMap<i32, Vec<(i32, i32)>> {
    let mut grouped: HashMap<i32, Vec<(i32, i32)>> = HashMap::new();

    for line in lines {
        let usable = recipe_ids.contains(&line.recipe)
            && known_ingredients.contains(&line.ingredient)
            && line.amount >= 1
            && grouped
                .get(&line.recipe)
                .is_none_or(|taken| taken.iter().all(|&(id, _)| id != line.ingredient));
        if usable {
            grouped
                .entry(line.recipe)
                .or_default()
                .push((line.ingredient, line.amount));
        } else {
            tracing::warn!(
                recipe_id = line.recipe,
                ingredient_id = line.ingredient,
                "Skipping recipe ingredient line"
            );
        }
    }

    grouped
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::user::tests::create_test_user;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn catalog_row(id: i32, name: &str, unit: &str) -> ingredient::Model {
        ingredient::Model {
            id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    fn record(name: &str, unit: &str) -> IngredientRecord {
        IngredientRecord {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[tokio::test]
    async fn test_import_ingredients_skips_existing_pairs() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[catalog_row(1, "salt", "g")]])
                .append_query_results([Vec::<ingredient::Model>::new()])
                .append_query_results([[catalog_row(2, "sugar", "g")]])
                .into_connection(),
        );
        let service = ImportService::new(
            IngredientRepository::new(db),
            UserRepository::new(empty_db()),
            RecipeRepository::new(empty_db()),
        );

        let report = service
            .import_ingredients(vec![
                record("salt", "g"),
                record("sugar", "g"),
                record(" ", "g"),
            ])
            .await
            .unwrap();

        assert_eq!(
            report,
            ImportReport {
                inserted: 1,
                updated: 0,
                skipped: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_import_users_skips_incomplete_and_existing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user(1, "taken")]])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[create_test_user(2, "fresh")]])
                .into_connection(),
        );
        let service = ImportService::new(
            IngredientRepository::new(empty_db()),
            UserRepository::new(db),
            RecipeRepository::new(empty_db()),
        );

        let rows = vec![
            UserRecord {
                email: Some("a@example.com".to_string()),
                username: None,
                password: Some("pw".to_string()),
                ..Default::default()
            },
            UserRecord {
                email: Some("taken@example.com".to_string()),
                username: Some("taken".to_string()),
                password: Some("pw".to_string()),
                ..Default::default()
            },
            UserRecord {
                email: Some("fresh@example.com".to_string()),
                username: Some("fresh".to_string()),
                password: Some("pw".to_string()),
                first_name: Some("Fresh".to_string()),
                last_name: None,
            },
        ];

        let report = service.import_users(rows).await.unwrap();

        assert_eq!(
            report,
            ImportReport {
                inserted: 1,
                updated: 0,
                skipped: 2,
            }
        );
    }

    fn stored_recipe(id: i32, author_id: i32, name: &str) -> recipe::Model {
        recipe::Model {
            id,
            author_id,
            name: name.to_string(),
            image: format!("recipes/images/{id}.png"),
            text: "Mix.".to_string(),
            cooking_time: 15,
            pub_date: Utc::now().into(),
        }
    }

    fn recipe_record(id: i32, author: i32, name: &str) -> RecipeRecord {
        RecipeRecord {
            id,
            author,
            name: name.to_string(),
            image: format!("recipes/images/{id}.png"),
            text: "Mix.".to_string(),
            cooking_time: 15,
            pub_date: None,
        }
    }

    const fn line(recipe: i32, ingredient: i32, amount: i32) -> RecipeLineRecord {
        RecipeLineRecord {
            recipe,
            ingredient,
            amount,
        }
    }

    fn exec_ok(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_import_recipes_creates_updates_and_skips_missing_authors() {
        let ingredient_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[catalog_row(1, "flour", "g"), catalog_row(2, "egg", "pcs")]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user(1, "baker")]])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[create_test_user(1, "baker")]])
                .into_connection(),
        );
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // id 10 exists and is overwritten
                .append_query_results([[stored_recipe(10, 1, "Old bread")]])
                .append_query_results([[stored_recipe(10, 1, "Bread")]])
                // id 12 is new
                .append_query_results([Vec::<recipe::Model>::new()])
                .append_query_results([[stored_recipe(12, 1, "Omelette")]])
                .append_exec_results([exec_ok(1), exec_ok(1), exec_ok(1), exec_ok(1)])
                .into_connection(),
        );
        let service = ImportService::new(
            IngredientRepository::new(ingredient_db),
            UserRepository::new(user_db),
            RecipeRepository::new(recipe_db),
        );

        let report = service
            .import_recipes(
                vec![
                    recipe_record(10, 1, "Bread"),
                    recipe_record(11, 99, "Ghost pie"),
                    recipe_record(12, 1, "Omelette"),
                ],
                vec![
                    line(10, 1, 500),
                    line(12, 2, 3),
                    line(12, 404, 1),
                    line(77, 1, 1),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            ImportReport {
                inserted: 1,
                updated: 1,
                skipped: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_import_recipes_skips_invalid_rows_without_queries() {
        let service = ImportService::new(
            IngredientRepository::new(empty_db()),
            UserRepository::new(empty_db()),
            RecipeRepository::new(empty_db()),
        );

        let mut no_time = recipe_record(1, 1, "Toast");
        no_time.cooking_time = 0;

        let report = service
            .import_recipes(vec![no_time, recipe_record(2, 1, "  ")], vec![])
            .await
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.inserted + report.updated, 0);
    }

    #[test]
    fn test_group_lines_drops_unusable_lines() {
        let recipe_ids: HashSet<i32> = [10, 12].into_iter().collect();
        let known: HashSet<i32> = [1, 2].into_iter().collect();

        let grouped = group_lines(
            vec![
                line(10, 1, 200),
                line(10, 1, 50),
                line(10, 2, 0),
                line(12, 2, 3),
                line(12, 404, 1),
                line(77, 1, 1),
            ],
            &recipe_ids,
            &known,
        );

        assert_eq!(grouped[&10], vec![(1, 200)]);
        assert_eq!(grouped[&12], vec![(2, 3)]);
        assert!(!grouped.contains_key(&77));
    }

    #[test]
    fn test_recipe_record_parses_pub_date() {
        let row: RecipeRecord = serde_json::from_str(
            r#"{"id":3,"author":1,"name":"Soup","image":"recipes/soup.png","text":"Boil.","cooking_time":20,"pub_date":"2024-05-01T12:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(row.pub_date.unwrap().to_rfc3339(), "2024-05-01T12:30:00+00:00");

        let row: RecipeRecord = serde_json::from_str(
            r#"{"id":4,"author":1,"name":"Tea","image":"t.png","text":"Steep.","cooking_time":3}"#,
        )
        .unwrap();
        assert!(row.pub_date.is_none());
    }

    #[test]
    fn test_user_record_optional_names() {
        let row: UserRecord =
            serde_json::from_str(r#"{"email":"x@y.z","username":"x","password":"p"}"#).unwrap();
        assert!(row.first_name.is_none());
        assert_eq!(non_empty(row.username).as_deref(), Some("x"));
        assert_eq!(non_empty(Some("  ".to_string())), None);
    }
}
