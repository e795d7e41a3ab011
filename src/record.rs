//! Feedback record model: label enums, classification results, and
//! validated record construction.

use crate::error::{Result, TriageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// Three-class sentiment polarity. Variant order matches the model
/// head's logit order, so `from_index` can map an argmax directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Positive => "Positive",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Negative" => Some(Self::Negative),
            "Neutral" => Some(Self::Neutral),
            "Positive" => Some(Self::Positive),
            _ => None,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Time-sensitivity classification of a feedback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UrgencyLabel {
    Low,
    Medium,
    High,
}

impl UrgencyLabel {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for UrgencyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Recommended handling action, derived from sentiment + urgency + domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityAction {
    #[serde(rename = "escalate-to-human")]
    EscalateToHuman,
    #[serde(rename = "monitor-and-review")]
    MonitorAndReview,
    #[serde(rename = "auto-respond")]
    AutoRespond,
    #[serde(rename = "no-action")]
    NoAction,
}

impl PriorityAction {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::EscalateToHuman => "escalate-to-human",
            Self::MonitorAndReview => "monitor-and-review",
            Self::AutoRespond => "auto-respond",
            Self::NoAction => "no-action",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "escalate-to-human" => Some(Self::EscalateToHuman),
            "monitor-and-review" => Some(Self::MonitorAndReview),
            "auto-respond" => Some(Self::AutoRespond),
            "no-action" => Some(Self::NoAction),
            _ => None,
        }
    }
}

impl std::fmt::Display for PriorityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Where a classification result came from. The fallback variants name
/// the reason for the degraded neutral result, so callers and tests
/// can tell the paths apart without inspecting logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    /// The configured backend produced this result.
    Model,
    /// The backend never loaded; the classifier runs degraded.
    ModelUnavailable,
    /// The backend loaded but this particular call failed.
    InferenceFailed,
}

/// Sentiment classification outcome for one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub prob: f32,
    pub origin: SignalOrigin,
}

impl Sentiment {
    /// The fixed degraded result: neutral at even confidence, tagged
    /// with the reason the model path was skipped.
    pub fn fallback(origin: SignalOrigin) -> Self {
        Self {
            label: SentimentLabel::Neutral,
            prob: 0.5,
            origin,
        }
    }
}

/// Urgency score for one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Urgency {
    pub label: UrgencyLabel,
    pub prob: f32,
}

/// A fully analyzed feedback item. Created once at ingestion, never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub owner_id: String,
    pub text: String,
    pub domain: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_prob: f32,
    pub urgency_label: UrgencyLabel,
    pub urgency_prob: f32,
    pub priority_action: PriorityAction,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated inputs for a feedback record. `build` is the only way
/// to obtain a `FeedbackRecord`, so every persisted record has passed
/// the same validation.
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub owner_id: String,
    pub text: String,
    pub domain: String,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub priority_action: PriorityAction,
}

impl RecordDraft {
    pub fn build(self) -> Result<FeedbackRecord> {
        let owner_id = self.owner_id.trim().to_string();
        if owner_id.is_empty() {
            return Err(TriageError::Validation {
                message: "owner id is required".into(),
            });
        }

        let text = normalize_text(&self.text);
        if text.is_empty() {
            return Err(TriageError::Validation {
                message: "feedback text is empty".into(),
            });
        }

        let domain = normalize_domain(&self.domain);

        Ok(FeedbackRecord {
            id: Uuid::new_v4().to_string(),
            owner_id,
            text,
            domain,
            sentiment_label: self.sentiment.label,
            sentiment_prob: self.sentiment.prob.clamp(0.0, 1.0),
            urgency_label: self.urgency.label,
            urgency_prob: self.urgency.prob.clamp(0.0, 1.0),
            priority_action: self.priority_action,
            created_at: Utc::now(),
        })
    }
}

/// Normalize feedback text: NFKC, collapse whitespace runs, trim.
pub fn normalize_text(text: &str) -> String {
    text.nfkc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a domain tag: lowercase, trimmed, empty becomes "general".
pub fn normalize_domain(domain: &str) -> String {
    let d = domain.trim().to_lowercase();
    if d.is_empty() { "general".to_string() } else { d }
}
