use std::env;
use std::time::Duration;

use tracing::info;

/// Application configuration loaded from environment variables.
/// Built once at process start and passed by reference into each component.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub openai_api_key: String,
    pub openai_model: String,

    // Email delivery
    pub brevo_api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub unsubscribe_base_url: String,

    // Translation (optional; keywords pass through untranslated when unset)
    pub deepl_api_key: Option<String>,

    // Sources
    pub nen_base_url: String,
    pub ted_search_url: String,

    // Request behavior
    pub request_timeout: Duration,
    pub max_fetch_attempts: u32,
    pub query_delay: Duration,
    pub max_queries_per_source: usize,

    // Scoring
    pub judge_delay: Duration,
    pub max_judged: usize,

    // Whole-run wall-clock budget
    pub task_deadline: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: required_env("OPENAI_API_KEY"),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o"),
            brevo_api_key: required_env("BREVO_API_KEY"),
            sender_email: env_or("SENDER_EMAIL", "vyhledavac@vyhledej-zakazky.cz"),
            sender_name: env_or("SENDER_NAME", "Vyhledávač Zakázek"),
            unsubscribe_base_url: env_or(
                "UNSUBSCRIBE_BASE_URL",
                "https://vyhledej-zakazky.cz/odhlasit/",
            ),
            deepl_api_key: env::var("DEEPL_API_KEY").ok().filter(|k| !k.is_empty()),
            nen_base_url: env_or("NEN_BASE_URL", "https://nen.nipez.cz"),
            ted_search_url: env_or(
                "TED_SEARCH_URL",
                "https://api.ted.europa.eu/v3/notices/search",
            ),
            request_timeout: Duration::from_secs(env_u64("REQUEST_TIMEOUT_SECS", 30)),
            max_fetch_attempts: env_u64("MAX_FETCH_ATTEMPTS", 3) as u32,
            query_delay: Duration::from_millis(env_u64("QUERY_DELAY_MS", 1000)),
            max_queries_per_source: env_u64("MAX_QUERIES_PER_SOURCE", 5) as usize,
            judge_delay: Duration::from_millis(env_u64("JUDGE_DELAY_MS", 200)),
            max_judged: env_u64("MAX_JUDGED", 50) as usize,
            task_deadline: Duration::from_secs(env_u64("TASK_DEADLINE_SECS", 300)),
        }
    }

    /// Log the effective configuration without leaking secrets.
    pub fn log_redacted(&self) {
        info!(
            model = %self.openai_model,
            nen = %self.nen_base_url,
            ted = %self.ted_search_url,
            sender = %self.sender_email,
            openai_key = if self.openai_api_key.is_empty() { "unset" } else { "set" },
            brevo_key = if self.brevo_api_key.is_empty() { "unset" } else { "set" },
            deepl_key = if self.deepl_api_key.is_some() { "set" } else { "unset" },
            timeout_secs = self.request_timeout.as_secs(),
            deadline_secs = self.task_deadline.as_secs(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {v:?}")),
        Err(_) => default,
    }
}
