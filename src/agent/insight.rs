//! Per-record recommendation text for support agents.
//!
//! Asks the configured generator for a one-paragraph analysis of a single
//! piece of feedback. When no generator is configured or the call fails,
//! callers get a canned recommendation tagged with its origin instead of
//! an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use crate::agent::generate::TextGenerator;
use crate::config::Config;
use crate::error::{Result, TriageError};

/// Canned recommendation used whenever generated text is unavailable.
pub const FALLBACK_INSIGHT: &str = "[Fallback Analysis]: This feedback highlights a critical \
user issue requiring immediate attention. The user expresses significant frustration, which \
poses a risk to customer satisfaction. Recommended Action: Escalate this ticket to a senior \
support agent for direct follow-up within the next hour to mitigate potential churn.";

/// How the insight text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightOrigin {
    /// Text came back from the generator.
    Generated,
    /// No generator is configured.
    Unavailable,
    /// The generator call failed or timed out.
    CallFailed,
}

/// A recommendation for one feedback record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub text: String,
    pub origin: InsightOrigin,
}

impl Insight {
    fn canned(origin: InsightOrigin) -> Self {
        Self {
            text: FALLBACK_INSIGHT.to_string(),
            origin,
        }
    }
}

/// Produces recommendations for individual feedback records.
pub struct InsightGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout_ms: u64,
}

impl InsightGenerator {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: &Config) -> Self {
        Self {
            generator,
            timeout_ms: config.system.agent_timeout_ms,
        }
    }

    /// Generates a one-paragraph recommendation for the given feedback text.
    ///
    /// Never fails: generator errors are logged and replaced with
    /// [`FALLBACK_INSIGHT`], with the origin recording what happened.
    pub async fn recommend(&self, feedback_text: &str) -> Insight {
        let Some(generator) = &self.generator else {
            debug!("no generator configured, returning canned insight");
            return Insight::canned(InsightOrigin::Unavailable);
        };

        match self.request_insight(generator.as_ref(), feedback_text).await {
            Ok(text) => Insight {
                text,
                origin: InsightOrigin::Generated,
            },
            Err(e) => {
                warn!(error = %e, "insight generation failed, returning canned insight");
                Insight::canned(InsightOrigin::CallFailed)
            }
        }
    }

    async fn request_insight(&self, generator: &dyn TextGenerator, text: &str) -> Result<String> {
        let prompt = format!(
            "As an expert customer support analyst, analyze the following feedback and \
             provide a concise, one-paragraph recommendation with an analysis and a \
             suggested action. Feedback: \"{text}\" Recommendation:"
        );

        let reply = timeout(
            Duration::from_millis(self.timeout_ms),
            generator.generate(&prompt),
        )
        .await
        .map_err(|_| TriageError::Timeout {
            operation: "insight generation".to_string(),
            timeout_ms: self.timeout_ms,
        })?
        .map_err(|e| TriageError::Agent {
            message: format!("insight generation failed: {e}"),
        })?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(TriageError::Agent {
                message: "generator returned an empty insight".to_string(),
            });
        }
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::generate::FakeGenerator;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Err(anyhow!("upstream unavailable"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct RecordingGenerator {
        seen: Mutex<Vec<String>>,
        reply: String,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("too late".to_string())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_unconfigured_returns_canned_insight() {
        let insights = InsightGenerator::new(None, &Config::default());
        let insight = insights.recommend("The app keeps crashing.").await;
        assert_eq!(insight.origin, InsightOrigin::Unavailable);
        assert_eq!(insight.text, FALLBACK_INSIGHT);
    }

    #[tokio::test]
    async fn test_generated_insight_passes_through() {
        let generator = Arc::new(FakeGenerator::new("Investigate the crash logs."));
        let insights = InsightGenerator::new(Some(generator), &Config::default());
        let insight = insights.recommend("The app keeps crashing.").await;
        assert_eq!(insight.origin, InsightOrigin::Generated);
        assert_eq!(insight.text, "Investigate the crash logs.");
    }

    #[tokio::test]
    async fn test_generated_insight_is_trimmed() {
        let generator = Arc::new(FakeGenerator::new("  Follow up today.\n"));
        let insights = InsightGenerator::new(Some(generator), &Config::default());
        let insight = insights.recommend("Slow checkout.").await;
        assert_eq!(insight.origin, InsightOrigin::Generated);
        assert_eq!(insight.text, "Follow up today.");
    }

    #[tokio::test]
    async fn test_empty_reply_returns_canned_insight() {
        let generator = Arc::new(FakeGenerator::new("  \n"));
        let insights = InsightGenerator::new(Some(generator), &Config::default());
        let insight = insights.recommend("Slow checkout.").await;
        assert_eq!(insight.origin, InsightOrigin::CallFailed);
        assert_eq!(insight.text, FALLBACK_INSIGHT);
    }

    #[tokio::test]
    async fn test_generator_failure_returns_canned_insight() {
        let insights = InsightGenerator::new(Some(Arc::new(FailingGenerator)), &Config::default());
        let insight = insights.recommend("My card was charged twice.").await;
        assert_eq!(insight.origin, InsightOrigin::CallFailed);
        assert_eq!(insight.text, FALLBACK_INSIGHT);
    }

    #[tokio::test]
    async fn test_slow_generator_times_out() {
        let mut config = Config::default();
        config.system.agent_timeout_ms = 10;
        let insights = InsightGenerator::new(Some(Arc::new(SlowGenerator)), &config);
        let insight = insights.recommend("Anything.").await;
        assert_eq!(insight.origin, InsightOrigin::CallFailed);
        assert_eq!(insight.text, FALLBACK_INSIGHT);
    }

    #[tokio::test]
    async fn test_prompt_embeds_quoted_feedback() {
        let generator = Arc::new(RecordingGenerator {
            seen: Mutex::new(Vec::new()),
            reply: "Escalate.".to_string(),
        });
        let insights = InsightGenerator::new(Some(generator.clone()), &Config::default());
        insights.recommend("The app crashed.").await;

        let prompts = generator.seen.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("As an expert customer support analyst"));
        assert!(prompts[0].contains("Feedback: \"The app crashed.\" Recommendation:"));
    }
}
