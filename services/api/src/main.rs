use anyhow::Result;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod middleware;
mod models;
mod routes;
mod state;

use common::database::{DatabaseConfig, init_pool};
use common::jobs::JobQueue;
use common::llm::OpenAiBackend;
use common::settings::Settings;
use matching::{MatchGenerator, PgMatchStore};
use tokio::net::TcpListener;

use crate::{
    middleware::{JwtConfig, JwtVerifier},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting API service");

    let settings = Settings::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt_config = JwtConfig::from_env().map_err(anyhow::Error::msg)?;
    let jwt = JwtVerifier::from_config(&jwt_config)?;

    let backend = OpenAiBackend::from_settings(&settings.llm)?;
    info!(model = %settings.llm.model, "Language model backend configured");

    let app_state = AppState {
        store: Arc::new(PgMatchStore::new(pool.clone())),
        generator: MatchGenerator::from_settings(Arc::new(backend), &settings.llm),
        jobs: JobQueue::new(pool),
        job_settings: settings.jobs.clone(),
        jwt,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&settings.server.bind_address).await?;
    info!("API service listening on {}", settings.server.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
