//! The per-text analysis pipeline: sentiment, urgency, domain rules,
//! then a validated record.
//!
//! One call is one unit of work with no internal parallelism. The
//! analyzer holds the shared classifier behind an `Arc`, so independent
//! calls can run concurrently from different tasks.

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{Result, TriageError};
use crate::record::{FeedbackRecord, RecordDraft, normalize_domain, normalize_text};
use crate::rules::RuleEngine;
use crate::sentiment::SentimentClassifier;
use crate::urgency;

/// Runs the full triage pipeline on one piece of feedback.
pub struct FeedbackAnalyzer {
    classifier: Arc<SentimentClassifier>,
    rules: RuleEngine,
}

impl FeedbackAnalyzer {
    pub fn new(classifier: Arc<SentimentClassifier>, rules: RuleEngine) -> Self {
        Self { classifier, rules }
    }

    /// Builds the analyzer from config: sentiment backend per
    /// `[system]`, default action per `[limits]`.
    pub fn from_config(config: &Config) -> Self {
        let classifier = Arc::new(SentimentClassifier::from_config(&config.sentiment()));
        let rules = RuleEngine::new(config.default_action());
        Self::new(classifier, rules)
    }

    pub fn classifier(&self) -> &SentimentClassifier {
        &self.classifier
    }

    /// Analyzes one text and returns the finished record.
    ///
    /// Blank text and blank owner are `Validation` errors; everything
    /// downstream of validation is infallible by construction.
    pub fn analyze(&self, text: &str, domain: &str, owner_id: &str) -> Result<FeedbackRecord> {
        let text = normalize_text(text);
        if text.is_empty() {
            return Err(TriageError::Validation {
                message: "feedback text is empty".into(),
            });
        }
        let domain = normalize_domain(domain);

        let sentiment = self.classifier.classify(&text);
        let base_urgency = urgency::score(&text);
        let (urgency, priority_action) = self.rules.apply(&text, sentiment, base_urgency, &domain);

        debug!(
            sentiment = %sentiment.label,
            urgency = %urgency.label,
            action = priority_action.as_wire(),
            %domain,
            "analyzed feedback"
        );

        RecordDraft {
            owner_id: owner_id.to_string(),
            text,
            domain,
            sentiment,
            urgency,
            priority_action,
        }
        .build()
    }
}
