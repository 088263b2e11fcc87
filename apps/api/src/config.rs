use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub skill_api_base_url: String,
    pub skill_api_token: String,
    pub port: u16,
    pub rust_log: String,
    /// Career questions drawn per run.
    pub career_question_limit: u32,
    /// Questions requested per skill session.
    pub session_question_count: u32,
    /// Pause between scoring a run and saving its result.
    pub finalize_delay_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            skill_api_base_url: require_env("SKILL_API_BASE_URL")?,
            skill_api_token: require_env("SKILL_API_TOKEN")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            career_question_limit: parse_env("CAREER_QUESTION_LIMIT", 5)
                .context("CAREER_QUESTION_LIMIT must be a number")?,
            session_question_count: parse_env("SESSION_QUESTION_COUNT", 5)
                .context("SESSION_QUESTION_COUNT must be a number")?,
            finalize_delay_secs: parse_env("FINALIZE_DELAY_SECS", 0)
                .context("FINALIZE_DELAY_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, T::Err> {
    match std::env::var(key) {
        Ok(raw) => raw.parse(),
        Err(_) => Ok(default),
    }
}
