//! Domain override rules and the priority decision table
//!
//! Domain-specific trigger keywords force urgency to High ahead of the
//! generic scorer; the final action comes from a fixed, total decision
//! table over (sentiment, urgency).

use crate::record::{PriorityAction, Sentiment, SentimentLabel, Urgency, UrgencyLabel};

/// Banking triggers that force urgency to High. "locked" is a stem so
/// phrasings like "account is locked" match too.
pub const BANKING_TRIGGERS: &[&str] = &[
    "otp",
    "transaction failed",
    "locked",
    "fraud",
];

/// Healthcare triggers that force urgency to High
pub const HEALTHCARE_TRIGGERS: &[&str] = &[
    "pain",
    "emergency",
    "appointment",
    "medication",
];

/// Ecommerce triggers that force urgency to High
pub const ECOMMERCE_TRIGGERS: &[&str] = &[
    "refund",
    "delivery",
    "not received",
    "damaged",
];

/// Per-domain trigger tables with the confidence their override carries
pub const DOMAIN_RULES: &[(&str, &[&str], f32)] = &[
    ("banking", BANKING_TRIGGERS, 0.95),
    ("healthcare", HEALTHCARE_TRIGGERS, 0.95),
    ("ecommerce", ECOMMERCE_TRIGGERS, 0.92),
];

/// Applies domain overrides and derives the priority action.
///
/// The otherwise-arm of the decision table is configurable; everything
/// else is fixed.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    default_action: PriorityAction,
}

impl RuleEngine {
    pub fn new(default_action: PriorityAction) -> Self {
        Self { default_action }
    }

    /// Apply domain rules to a scored text and decide the action.
    ///
    /// A matching domain trigger replaces the scorer's urgency with
    /// High at the rule's fixed confidence, regardless of the prior
    /// label. The decision table then runs on the overridden result,
    /// so a trigger can flip the action to escalation on its own.
    pub fn apply(
        &self,
        text: &str,
        sentiment: Sentiment,
        urgency: Urgency,
        domain: &str,
    ) -> (Urgency, PriorityAction) {
        let text_lower = text.to_lowercase();
        let mut urgency = urgency;

        for (rule_domain, triggers, confidence) in DOMAIN_RULES {
            if domain == *rule_domain && triggers.iter().any(|k| text_lower.contains(k)) {
                urgency = Urgency {
                    label: UrgencyLabel::High,
                    prob: *confidence,
                };
                break;
            }
        }

        (urgency, self.decide(sentiment.label, urgency.label))
    }

    /// The fixed decision table over (sentiment, urgency). Total: every
    /// combination maps to exactly one action.
    pub fn decide(&self, sentiment: SentimentLabel, urgency: UrgencyLabel) -> PriorityAction {
        match (sentiment, urgency) {
            (SentimentLabel::Negative, UrgencyLabel::High) => PriorityAction::EscalateToHuman,
            (_, UrgencyLabel::Medium) => PriorityAction::MonitorAndReview,
            _ => self.default_action,
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(PriorityAction::AutoRespond)
    }
}
