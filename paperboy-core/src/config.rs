//! Configuration system for paperboy.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! explicit config file -> environment variables. Secrets are never stored in
//! config files; fields like `api_key_env` name the environment variable that
//! holds the secret, resolved at client construction time.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for a digest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperboyConfig {
    pub llm: LlmConfig,
    pub email: EmailConfig,
    pub fetch: FetchConfig,
    pub state: StateConfig,
    pub reports: ReportConfig,
}

/// LLM provider configuration (Gemini).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier (e.g., "gemini-2.5-flash").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Hard ceiling on API calls per run, shared between classification
    /// and summarization.
    pub max_calls: usize,
    /// Papers per classification batch.
    pub batch_size: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            max_calls: 80,
            batch_size: 10,
        }
    }
}

/// Outbound email configuration. Send-only: the digest never reads mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender address, also used as the SMTP username.
    pub sender: String,
    pub recipient: String,
    /// Environment variable name containing the SMTP password or app password.
    pub password_env: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: String::new(),
            recipient: String::new(),
            password_env: "SMTP_PASSWORD".to_string(),
        }
    }
}

/// Paper-source configuration: queries, toggles, and window defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// ArXiv search queries, issued in order. ArXiv query syntax.
    pub arxiv_queries: Vec<String>,
    /// Maximum results requested per arXiv query.
    pub max_results_per_query: usize,
    /// Whether to also query Semantic Scholar.
    pub s2_enabled: bool,
    /// Semantic Scholar search queries (plain keyword syntax).
    pub s2_queries: Vec<String>,
    /// Environment variable for the optional Semantic Scholar API key.
    pub s2_api_key_env: String,
    /// Whether to also pull HuggingFace Daily Papers.
    pub hf_enabled: bool,
    /// Keywords a HuggingFace paper must mention to be kept.
    pub hf_keywords: Vec<String>,
    /// Lookback for the very first run, when no state file exists yet.
    pub default_lookback_days: i64,
    /// Maximum industry papers sent for summarization.
    pub summary_cap: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            arxiv_queries: vec![
                // Recommendation systems
                r#"all:"recommendation system" OR all:"recommender system""#.to_string(),
                r#"all:"collaborative filtering""#.to_string(),
                r#"all:"click-through rate" OR all:"CTR prediction""#.to_string(),
                r#"all:"learning to rank""#.to_string(),
                r#"all:"information retrieval" AND cat:cs.IR"#.to_string(),
                // LLM x RecSys / ranking / retrieval
                r#"all:"large language model" AND all:"recommendation""#.to_string(),
                r#"all:"LLM" AND all:"ranking""#.to_string(),
                r#"all:"large language model" AND all:"retrieval""#.to_string(),
                // RAG & generative retrieval
                r#"all:"retrieval-augmented generation""#.to_string(),
                r#"all:"generative retrieval""#.to_string(),
                // Dense / neural retrieval
                r#"all:"dense retrieval""#.to_string(),
                r#"all:"neural information retrieval""#.to_string(),
                // LLM as judge for ranking
                r#"all:"LLM" AND all:"relevance" AND all:"search""#.to_string(),
            ],
            max_results_per_query: 100,
            s2_enabled: true,
            s2_queries: vec![
                "recommender system".to_string(),
                "collaborative filtering".to_string(),
                "large language model recommendation".to_string(),
                "retrieval-augmented generation".to_string(),
                "dense retrieval".to_string(),
                "learning to rank".to_string(),
            ],
            s2_api_key_env: "S2_API_KEY".to_string(),
            hf_enabled: true,
            hf_keywords: vec![
                "recommend".to_string(),
                "collaborative filtering".to_string(),
                "ranking".to_string(),
                "retrieval".to_string(),
                "ctr prediction".to_string(),
                "click-through".to_string(),
                "search".to_string(),
                "information retrieval".to_string(),
            ],
            default_lookback_days: 3,
            summary_cap: 30,
        }
    }
}

/// Run-state persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path to the state file tracking the last completed window end.
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("state.json"),
        }
    }
}

/// Local report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the per-run HTML and JSON reports are written to.
    pub dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
        }
    }
}

impl PaperboyConfig {
    /// Sanity-check the configuration and return human-readable warnings.
    /// Warnings do not prevent a run.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.llm.batch_size == 0 {
            warnings.push("llm.batch_size is 0; no papers will be classified".to_string());
        }
        if self.llm.max_calls == 0 {
            warnings.push("llm.max_calls is 0; classification and summaries are disabled".to_string());
        }
        if self.fetch.arxiv_queries.is_empty() && !self.fetch.s2_enabled && !self.fetch.hf_enabled {
            warnings.push("no paper sources are configured; every run will be empty".to_string());
        }
        if self.fetch.default_lookback_days <= 0 {
            warnings.push(format!(
                "fetch.default_lookback_days ({}) is not positive",
                self.fetch.default_lookback_days
            ));
        }
        warnings
    }

    /// Check that every environment variable a run will need is present,
    /// before any network call is made.
    ///
    /// The LLM key is always required. Mail settings are only required when
    /// an email will actually be sent (not dry-run, not no-email).
    pub fn validate_for_run(&self, will_send_email: bool) -> Result<(), ConfigError> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(ConfigError::EnvVarMissing {
                var: self.llm.api_key_env.clone(),
            });
        }
        if will_send_email {
            if self.email.sender.is_empty() || self.email.recipient.is_empty() {
                return Err(ConfigError::Invalid {
                    message: "email.sender and email.recipient must be set to send email \
                              (or pass --no-email)"
                        .to_string(),
                });
            }
            if std::env::var(&self.email.password_env).is_err() {
                return Err(ConfigError::EnvVarMissing {
                    var: self.email.password_env.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `PAPERBOY_`, `__`-nested)
/// 2. Explicit config file (`--config`)
/// 3. User config (`~/.config/paperboy/config.toml`)
/// 4. Built-in defaults
pub fn load_config(explicit: Option<&Path>) -> Result<PaperboyConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(PaperboyConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "paperboy", "paperboy") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (PAPERBOY_LLM__MODEL, PAPERBOY_EMAIL__RECIPIENT, ...)
    figment = figment.merge(Env::prefixed("PAPERBOY_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
