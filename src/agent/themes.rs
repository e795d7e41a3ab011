//! Theme extraction over a batch of feedback texts
//!
//! One generation request asking for a JSON array of 3-5 themes,
//! gated by a minimum-volume threshold and bounded by a sample cap.
//! Every failure mode maps to a canned list tagged with its origin.

use super::generate::TextGenerator;
use crate::config::Config;
use crate::error::{Result, TriageError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Canned themes when the service is unconfigured or volume is below the gate
pub const DEFAULT_THEMES: &[&str] = &[
    "App Performance",
    "Login Issues",
    "UI Feedback",
    "Feature Request",
];

/// Canned themes when a dispatched call fails or returns malformed output.
/// Deliberately distinct from `DEFAULT_THEMES` so the two paths are
/// distinguishable even without the origin tag.
pub const ERROR_THEMES: &[&str] = &["App Performance", "Login Issues", "UI Feedback"];

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\n?|```").unwrap());

/// How a theme list was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeOrigin {
    Generated,
    BelowMinVolume,
    Unavailable,
    CallFailed,
    ParseFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeReport {
    pub themes: Vec<String>,
    pub origin: ThemeOrigin,
}

impl ThemeReport {
    fn canned(origin: ThemeOrigin) -> Self {
        let source = match origin {
            ThemeOrigin::CallFailed | ThemeOrigin::ParseFailure => ERROR_THEMES,
            _ => DEFAULT_THEMES,
        };
        Self {
            themes: source.iter().map(|s| s.to_string()).collect(),
            origin,
        }
    }
}

pub struct ThemeExtractor {
    generator: Option<Arc<dyn TextGenerator>>,
    min_texts: usize,
    sample_cap: usize,
    timeout_ms: u64,
}

impl ThemeExtractor {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: &Config) -> Self {
        Self {
            generator,
            min_texts: config.limits.theme_min_texts,
            sample_cap: config.limits.theme_sample_cap,
            timeout_ms: config.system.agent_timeout_ms,
        }
    }

    /// Derive recurring themes from feedback texts. Never fails: every
    /// failure mode yields a canned report tagged with its origin.
    pub async fn extract(&self, texts: &[String]) -> ThemeReport {
        let Some(generator) = &self.generator else {
            return ThemeReport::canned(ThemeOrigin::Unavailable);
        };
        if texts.len() < self.min_texts {
            return ThemeReport::canned(ThemeOrigin::BelowMinVolume);
        }

        match self.request_themes(generator.as_ref(), texts).await {
            Ok(themes) => ThemeReport {
                themes,
                origin: ThemeOrigin::Generated,
            },
            Err(e @ TriageError::MalformedResponse { .. }) => {
                warn!("Theme extraction returned malformed output: {}", e);
                ThemeReport::canned(ThemeOrigin::ParseFailure)
            }
            Err(e) => {
                warn!("Theme extraction call failed: {}", e);
                ThemeReport::canned(ThemeOrigin::CallFailed)
            }
        }
    }

    async fn request_themes(
        &self,
        generator: &dyn TextGenerator,
        texts: &[String],
    ) -> Result<Vec<String>> {
        // Sample the head of the batch to bound request size
        let feedback_block = texts
            .iter()
            .take(self.sample_cap)
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Analyze the following customer feedback. Identify the 3-5 most common themes. \
             Return ONLY a valid JSON array of strings. \
             Example: [\"Login Problems\", \"UI Suggestions\", \"Payment Failures\"]. \
             Feedback:\n{}\n\nJSON Response:",
            feedback_block
        );

        let reply = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            generator.generate(&prompt),
        )
        .await
        .map_err(|_| TriageError::Timeout {
            operation: "theme extraction".into(),
            timeout_ms: self.timeout_ms,
        })?
        .map_err(|e| TriageError::Agent {
            message: e.to_string(),
        })?;

        let cleaned = strip_code_fences(&reply);
        let themes: Vec<String> = serde_json::from_str(cleaned.trim())?;
        if themes.is_empty() {
            return Err(TriageError::MalformedResponse {
                message: "theme array was empty".into(),
            });
        }
        Ok(themes)
    }
}

/// Remove markdown code-fence markers anywhere in the reply
fn strip_code_fences(reply: &str) -> String {
    FENCE_RE.replace_all(reply.trim(), "").into_owned()
}
