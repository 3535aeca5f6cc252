use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// Process-wide configuration used by the binary.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| panic!("FATAL: invalid configuration: {e}"))
});

pub const CONFIG_FILE: &str = "mealwise.toml";
pub const ENV_PREFIX: &str = "MEALWISE_";

pub const PINTEREST_AUTH_URL: &str = "https://www.pinterest.com/oauth/";
pub const PINTEREST_SCOPES: &[&str] = &["boards:read", "pins:read", "user_accounts:read"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub llm: LlmConfig,
    pub planner: PlannerConfig,
    pub pinterest: PinterestConfig,
    pub import: ImportConfig,
}

impl Config {
    /// Defaults, then `mealwise.toml`, then `MEALWISE_*` env vars (`__` nests sections).
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// Shared key the frontend presents on every `/api` call.
    pub service_key: String,
    /// At least 64 bytes; used to encrypt the OAuth cookie jar.
    pub cookie_secret: String,
    pub insecure_cookie: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite://mealwise.sqlite".to_string(),
            loglevel: "info".to_string(),
            service_key: "change-me".to_string(),
            cookie_secret: String::new(),
            insecure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    /// Provider default when unset.
    pub base_url: Option<Url>,
    pub max_tokens: u32,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            api_key: String::new(),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            max_tokens: 4096,
            requests_per_minute: 30,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Upper bound on the fraction of a week's dinners taken from the recipe cache.
    pub cache_share: f64,
    /// Meals served in this many previous weeks are not reused.
    pub recent_weeks: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cache_share: 0.5,
            recent_weeks: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinterestConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: Url,
    pub api_base: Url,
    /// Where the browser lands after the OAuth callback completes.
    pub post_connect_redirect: String,
    pub refresh_margin_secs: i64,
}

impl Default for PinterestConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: Url::parse("http://localhost:8000/pinterest/callback")
                .expect("valid default url"),
            api_base: Url::parse("https://api.pinterest.com/v5/").expect("valid default url"),
            post_connect_redirect: "/".to_string(),
            refresh_margin_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub concurrency: usize,
    pub max_page_chars: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_page_chars: 12_000,
            fetch_timeout_secs: 15,
        }
    }
}
