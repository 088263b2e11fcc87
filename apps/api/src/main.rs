mod assessment;
mod config;
mod db;
mod errors;
mod models;
mod question_source;
mod routes;
mod skill_client;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessment::registry::RunRegistry;
use crate::assessment::results::PgResultStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::question_source::PgQuestionSource;
use crate::routes::build_router;
use crate::skill_client::SkillClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Assessment API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize the skill-testing API client
    let skill_api = SkillClient::new(&config.skill_api_base_url, &config.skill_api_token)?;
    info!("Skill API client initialized ({})", config.skill_api_base_url);

    // Build app state
    let state = AppState {
        questions: Arc::new(PgQuestionSource::new(db.clone())),
        skill_api: Arc::new(skill_api),
        results: Arc::new(PgResultStore::new(db)),
        runs: RunRegistry::new(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
