//! Data loading CLI: ingredient catalog, users, recipes and migrations.

use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use foodgram_common::Config;
use foodgram_core::{ImportService, IngredientRecord, RecipeLineRecord, RecipeRecord, UserRecord};
use foodgram_db::repositories::{IngredientRepository, RecipeRepository, UserRepository};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "foodgram-import")]
#[command(about = "Load data into a foodgram-rs database", long_about = None)]
struct Cli {
    /// Configuration file; defaults to the layered `config/` lookup
    #[arg(long, global = true, env = "FOODGRAM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load `[{"name", "measurement_unit"}]`, skipping existing pairs
    Ingredients {
        /// JSON file to read
        file: PathBuf,
    },

    /// Create users from `[{"email", "username", "password", ...}]`
    Users {
        /// JSON file to read
        file: PathBuf,
    },

    /// Create or overwrite recipes by ID, with their ingredient lines.
    /// Recipes whose author does not exist are skipped
    Recipes {
        /// `[{"id", "author", "name", "image", "text", "cooking_time", "pub_date"}]`
        recipes: PathBuf,
        /// `[{"recipe", "ingredient", "amount"}]`
        recipe_ingredients: PathBuf,
    },

    /// Run pending migrations
    Migrate,
}

fn read_json<T: DeserializeOwned>(path: &PathBuf) -> anyhow::Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Cannot parse {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    let db = foodgram_db::init(&config).await?;
    foodgram_db::migrate(&db).await?;

    let db = Arc::new(db);
    let service = ImportService::new(
        IngredientRepository::new(Arc::clone(&db)),
        UserRepository::new(Arc::clone(&db)),
        RecipeRepository::new(Arc::clone(&db)),
    );

    match cli.command {
        Commands::Ingredients { file } => {
            let records: Vec<IngredientRecord> = read_json(&file)?;
            let report = service.import_ingredients(records).await?;
            info!(
                inserted = report.inserted,
                skipped = report.skipped,
                "Ingredients loaded"
            );
        }
        Commands::Users { file } => {
            let records: Vec<UserRecord> = read_json(&file)?;
            let report = service.import_users(records).await?;
            info!(
                inserted = report.inserted,
                skipped = report.skipped,
                "Users loaded"
            );
        }
        Commands::Recipes {
            recipes,
            recipe_ingredients,
        } => {
            let recipes: Vec<RecipeRecord> = read_json(&recipes)?;
            let lines: Vec<RecipeLineRecord> = read_json(&recipe_ingredients)?;
            let report = service.import_recipes(recipes, lines).await?;
            info!(
                inserted = report.inserted,
                updated = report.updated,
                skipped = report.skipped,
                "Recipes loaded"
            );
        }
        Commands::Migrate => {
            info!("Migrations completed");
        }
    }

    Ok(())
}
