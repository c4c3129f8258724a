//! Test utilities for database operations.
//!
//! Each integration test gets its own throwaway database, created from the
//! server named by the `TEST_DB_*` variables and migrated to the latest
//! schema.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Set,
    Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{ingredient, recipe};
use crate::migrations::Migrator;
use crate::repositories::RecipeRepository;

/// Connection settings of the test server.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database the tests run in.
    pub database: String,
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: env_or("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: env_or("TEST_DB_USER", "foodgram_test"),
            password: env_or("TEST_DB_PASSWORD", "foodgram_test"),
            database: env_or("TEST_DB_NAME", "foodgram_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of the test database.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// URL of the maintenance database, used to create and drop test
    /// databases.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        self.url_for("postgres")
    }

    fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A migrated test database.
pub struct TestDatabase {
    pub conn: DatabaseConnection,
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to an existing database and migrate it.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;
        Ok(Self { conn, config })
    }

    /// Create a database with a random `foodgram_test_*` name so tests can
    /// run in parallel. Pair with [`Self::drop_database`].
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("foodgram_test_{}", &suffix[..8]);

        let admin = Database::connect(&config.postgres_url()).await?;
        admin
            .execute_unprepared(&format!("CREATE DATABASE \"{}\"", config.database))
            .await?;
        admin.close().await?;

        info!(database = %config.database, "Created test database");
        Self::with_config(config).await
    }

    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Close the connection and drop the database.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        let Self { conn, config } = self;
        conn.close().await?;

        let admin = Database::connect(&config.postgres_url()).await?;
        admin
            .execute_unprepared(&format!(
                "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                config.database
            ))
            .await?;
        admin.close().await?;

        info!(database = %config.database, "Dropped test database");
        Ok(())
    }
}

/// Insert a user row directly and return its ID.
pub async fn insert_user(conn: &DatabaseConnection, username: &str) -> Result<i32, DbErr> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "INSERT INTO \"user\" (email, username, first_name, last_name, password) \
             VALUES ($1, $2, '', '', '') RETURNING id",
            [format!("{username}@example.com").into(), username.into()],
        ))
        .await?
        .ok_or(DbErr::RecordNotInserted)?;
    row.try_get("", "id")
}

/// Insert a catalog ingredient and return its ID.
pub async fn insert_ingredient(
    conn: &DatabaseConnection,
    name: &str,
    unit: &str,
) -> Result<i32, DbErr> {
    let model = ingredient::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(unit.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(model.id)
}

/// A recipe by `author_id` with placeholder text and image.
#[must_use]
pub fn recipe_model(author_id: i32, name: &str) -> recipe::ActiveModel {
    recipe::ActiveModel {
        author_id: Set(author_id),
        name: Set(name.to_string()),
        image: Set(format!("recipes/images/{}.png", name.to_lowercase())),
        text: Set(format!("How to make {name}.")),
        cooking_time: Set(30),
        pub_date: Set(Utc::now().into()),
        ..Default::default()
    }
}

/// Insert a recipe with its `(ingredient_id, amount)` lines and return its
/// ID.
pub async fn insert_recipe(
    repo: &RecipeRepository,
    author_id: i32,
    name: &str,
    lines: &[(i32, i32)],
) -> Result<i32, DbErr> {
    repo.create_with_ingredients(recipe_model(author_id, name), lines)
        .await
        .map(|r| r.id)
        .map_err(|e| DbErr::Custom(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_share_server() {
        let config = TestDbConfig {
            host: "db".to_string(),
            port: 5433,
            username: "user".to_string(),
            password: "pass".to_string(),
            database: "testdb".to_string(),
        };
        assert_eq!(config.database_url(), "postgres://user:pass@db:5433/testdb");
        assert_eq!(config.postgres_url(), "postgres://user:pass@db:5433/postgres");
    }

    #[test]
    fn test_recipe_model_fills_required_fields() {
        let model = recipe_model(4, "Pancakes");
        assert_eq!(model.author_id, Set(4));
        assert_eq!(model.image, Set("recipes/images/pancakes.png".to_string()));
        assert_eq!(model.cooking_time, Set(30));
    }
}
