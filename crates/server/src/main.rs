//! Foodgram-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use foodgram_api::{AppState, app};
use foodgram_common::{Config, StorageBackend};
use foodgram_core::{
    FollowService, IngredientService, RecipeMarkerService, RecipeService, ShoppingListService,
    ShortLinkService, UserService,
};
use foodgram_db::repositories::{
    FollowRepository, IngredientRepository, RecipeIngredientRepository, RecipeMarkerRepository,
    RecipeRepository, ShortLinkRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Wire repositories and services over one connection pool.
fn build_state(
    db: &Arc<DatabaseConnection>,
    storage: Arc<dyn StorageBackend>,
    config: &Config,
) -> AppState {
    let user_repo = UserRepository::new(Arc::clone(db));
    let follow_repo = FollowRepository::new(Arc::clone(db));
    let ingredient_repo = IngredientRepository::new(Arc::clone(db));
    let recipe_repo = RecipeRepository::new(Arc::clone(db));
    let line_repo = RecipeIngredientRepository::new(Arc::clone(db));
    let marker_repo = RecipeMarkerRepository::new(Arc::clone(db));
    let short_link_repo = ShortLinkRepository::new(Arc::clone(db));

    let user_service = UserService::new(
        user_repo.clone(),
        follow_repo.clone(),
        Arc::clone(&storage),
    );
    let ingredient_service = IngredientService::new(ingredient_repo.clone());
    let recipe_service = RecipeService::new(
        recipe_repo.clone(),
        line_repo.clone(),
        ingredient_repo,
        marker_repo.clone(),
        user_repo.clone(),
        follow_repo.clone(),
        Arc::clone(&storage),
    );
    let recipe_marker_service = RecipeMarkerService::new(marker_repo.clone(), recipe_repo.clone());
    let follow_service = FollowService::new(follow_repo, user_repo.clone(), recipe_repo.clone());
    let shopping_list_service =
        ShoppingListService::new(marker_repo, recipe_repo.clone(), line_repo, user_repo);
    let short_link_service = ShortLinkService::new(short_link_repo, recipe_repo);

    AppState {
        user_service,
        ingredient_service,
        recipe_service,
        recipe_marker_service,
        follow_service,
        shopping_list_service,
        short_link_service,
        storage,
        base_url: config.server.url.trim_end_matches('/').to_string(),
        pagination: config.pagination.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting foodgram-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = foodgram_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    foodgram_db::migrate(&db).await?;
    info!("Migrations completed");

    let storage: Arc<dyn StorageBackend> = Arc::new(config.storage.storage_config().build());
    let state = build_state(&Arc::new(db), storage, &config);

    // Build router
    let media_route = config.storage.base_url.clone();
    let app = app(state)
        .nest_service(&media_route, ServeDir::new(&config.storage.base_path))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
