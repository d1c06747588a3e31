use anyhow::{bail, Context, Result};

/// Which key-value backend holds session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    /// Attempts per model call. 1 means no retry.
    pub llm_max_attempts: u32,
    pub llm_timeout_seconds: u64,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub session_ttl_seconds: u64,
    /// Countdown for the timed HR stage.
    pub hr_stage_seconds: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend = match optional_env("STORE_BACKEND", "redis").as_str() {
            "redis" => StoreBackend::Redis,
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be 'redis' or 'memory', got '{other}'"),
        };

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: optional_env("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_api_base: optional_env(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com",
            ),
            llm_max_attempts: parse_positive_env("LLM_MAX_ATTEMPTS", 1)?,
            llm_timeout_seconds: parse_env("LLM_TIMEOUT_SECONDS", 120)?,
            store_backend,
            redis_url: optional_env("REDIS_URL", "redis://127.0.0.1:6379"),
            session_ttl_seconds: parse_positive_env("SESSION_TTL_SECONDS", 24 * 60 * 60)?,
            hr_stage_seconds: parse_positive_env("HR_STAGE_SECONDS", 300)?,
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Like `parse_env`, but zero is rejected.
fn parse_positive_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + PartialEq + From<u8>,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse_env(key, default)?;
    if value == T::from(0u8) {
        bail!("{key} must be at least 1");
    }
    Ok(value)
}

#[cfg(test)]
impl Config {
    /// Configuration for unit tests: in-memory store, short stage timer.
    pub fn for_tests() -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_api_base: "http://127.0.0.1:0".to_string(),
            llm_max_attempts: 1,
            llm_timeout_seconds: 5,
            store_backend: StoreBackend::Memory,
            redis_url: String::new(),
            session_ttl_seconds: 60,
            hr_stage_seconds: 300,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
