use std::sync::Arc;

use crate::assessment::registry::RunRegistry;
use crate::assessment::results::ResultStore;
use crate::config::Config;
use crate::question_source::QuestionSource;
use crate::skill_client::SkillApi;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Career question supply. Default: randomized batches from Postgres.
    pub questions: Arc<dyn QuestionSource>,
    /// The external skill-testing API.
    pub skill_api: Arc<dyn SkillApi>,
    /// Where finished results land.
    pub results: Arc<dyn ResultStore>,
    /// Live runs, keyed by run id.
    pub runs: RunRegistry,
    pub config: Config,
}
