use crate::record::PriorityAction;
use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from feedback_triage.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub limits: LimitsConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// System-level configuration for the sentiment model, storage, and the agent
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub sentiment_provider: String,
    pub model_dir: Option<String>,
    pub max_tokens: usize,
    pub database_path: String,
    pub gemini_model: String,
    pub agent_timeout_ms: u64,
}

/// Sentiment backend configuration snapshot for use across components
#[derive(Debug, Clone)]
pub struct SentimentConfig {
    pub provider: String,
    pub model_dir: Option<String>,
    pub max_tokens: usize,
}

/// Aggregation and triage limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub theme_min_texts: usize,
    pub theme_sample_cap: usize,
    pub critical_limit: usize,
    pub trend_days: i64,
    pub default_action: String,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub google_api_key: Option<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sentiment_provider: "candle".to_string(),
            model_dir: None,
            max_tokens: 512,
            database_path: default_database_path(),
            gemini_model: "gemini-1.5-flash".to_string(),
            agent_timeout_ms: 20_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            theme_min_texts: 5,
            theme_sample_cap: 50,
            critical_limit: 10,
            trend_days: 30,
            default_action: "auto-respond".to_string(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| {
            d.join("feedback-triage")
                .join("feedback.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "feedback.db".to_string())
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses TRIAGE_CONFIG environment variable or defaults to "feedback_triage.toml".
    pub fn load() -> anyhow::Result<Self> {
        // Load environment variables with smart fallbacks:
        // 1) TRIAGE_ENV_FILE if set
        // 2) ./.env
        // 3) ../.env (repo root when running from crate dir)
        if let Ok(env_path) = std::env::var("TRIAGE_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
            let core_present = std::env::var("GOOGLE_API_KEY").is_ok()
                || std::env::var("TRIAGE_DB_PATH").is_ok()
                || std::env::var("TRIAGE_MODEL_DIR").is_ok();
            if !core_present {
                let _ = dotenvy::from_path("../.env");
            }
        }

        let config_path =
            std::env::var("TRIAGE_CONFIG").unwrap_or_else(|_| "feedback_triage.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        // Apply env overrides (env-first)
        if let Ok(provider) = std::env::var("TRIAGE_SENTIMENT_PROVIDER") {
            config.system.sentiment_provider = provider;
        }
        if let Ok(model_dir) = std::env::var("TRIAGE_MODEL_DIR") {
            config.system.model_dir = Some(model_dir);
        }
        if let Ok(db_path) = std::env::var("TRIAGE_DB_PATH") {
            config.system.database_path = db_path;
        }
        if let Some(timeout) = std::env::var("TRIAGE_AGENT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.system.agent_timeout_ms = timeout;
        }

        config.runtime = RuntimeConfig::load_from_env();

        // Log env overrides for debugging (env-first confirmation)
        if std::env::var("TRIAGE_SENTIMENT_PROVIDER").is_ok() {
            tracing::debug!("TRIAGE_SENTIMENT_PROVIDER env override applied");
        }
        if std::env::var("TRIAGE_DB_PATH").is_ok() {
            tracing::debug!("TRIAGE_DB_PATH env override applied");
        }

        config.validate();

        Ok(config)
    }

    /// Validate the configuration, clamping out-of-range values with a warning.
    /// Loading never fails on a misconfigured sentiment backend; the
    /// classifier degrades at construction instead.
    pub fn validate(&mut self) {
        match self.system.sentiment_provider.as_str() {
            "candle" | "local" => {
                if self.system.model_dir.is_none() {
                    tracing::warn!(
                        "Sentiment provider '{}' has no model_dir configured; classifier will run degraded",
                        self.system.sentiment_provider
                    );
                }
            }
            "lexicon" => {}
            other => {
                tracing::warn!(
                    "Unknown sentiment provider '{}', classifier will run degraded",
                    other
                );
            }
        }

        if self.system.max_tokens == 0 {
            self.system.max_tokens = 512;
        } else if self.system.max_tokens > 512 {
            // BERT position embeddings cap the sequence length
            tracing::warn!(
                "max_tokens {} exceeds model limit 512, clamping",
                self.system.max_tokens
            );
            self.system.max_tokens = 512;
        }

        if self.system.agent_timeout_ms == 0 {
            tracing::warn!("agent_timeout_ms 0 is invalid, using 20000");
            self.system.agent_timeout_ms = 20_000;
        }

        if self.limits.theme_min_texts == 0 {
            self.limits.theme_min_texts = 1;
        }
        if self.limits.theme_sample_cap < self.limits.theme_min_texts {
            tracing::warn!(
                "theme_sample_cap {} is below theme_min_texts {}, raising",
                self.limits.theme_sample_cap,
                self.limits.theme_min_texts
            );
            self.limits.theme_sample_cap = self.limits.theme_min_texts;
        }
        if self.limits.critical_limit == 0 {
            self.limits.critical_limit = 1;
        }
        if !(1..=365).contains(&self.limits.trend_days) {
            tracing::warn!(
                "trend_days {} out of range 1..=365, using 30",
                self.limits.trend_days
            );
            self.limits.trend_days = 30;
        }

        if PriorityAction::from_wire(&self.limits.default_action).is_none() {
            tracing::warn!(
                "Unknown default_action '{}', using 'auto-respond'",
                self.limits.default_action
            );
            self.limits.default_action = "auto-respond".to_string();
        }
    }

    /// Convenience: snapshot sentiment backend configuration
    pub fn sentiment(&self) -> SentimentConfig {
        SentimentConfig {
            provider: self.system.sentiment_provider.clone(),
            model_dir: self.system.model_dir.clone(),
            max_tokens: self.system.max_tokens,
        }
    }

    /// The default action for records no decision rule claims
    pub fn default_action(&self) -> PriorityAction {
        PriorityAction::from_wire(&self.limits.default_action).unwrap_or(PriorityAction::AutoRespond)
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
        }
    }
}
