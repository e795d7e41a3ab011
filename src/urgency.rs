//! Urgency scoring heuristics for feedback text
//!
//! This module contains the keyword-driven urgency scorer. No learned
//! model: the text is lower-cased and tested for membership against
//! ordered keyword tiers, first match wins.

use crate::record::{Urgency, UrgencyLabel};

/// Keywords that indicate high urgency (outages, time pressure, escalation language)
pub const HIGH_KEYWORDS: &[&str] = &[
    "urgent",
    "immediate",
    "asap",
    "emergency",
    "critical",
    "now",
    "broken",
    "cannot work",
];

/// Keywords that indicate medium urgency (friction, soft time pressure)
pub const MEDIUM_KEYWORDS: &[&str] = &[
    "soon",
    "quickly",
    "please help",
    "important",
    "slow",
    "issue",
    "problem",
    "confusing",
];

/// Fixed confidence reported for a High-tier match
pub const HIGH_CONFIDENCE: f32 = 0.92;
/// Fixed confidence reported for a Medium-tier match
pub const MEDIUM_CONFIDENCE: f32 = 0.78;
/// Fixed confidence reported when no keyword matches
pub const LOW_CONFIDENCE: f32 = 0.65;

/// Score the urgency of a feedback text using keyword heuristics.
///
/// Tiers are checked in priority order High > Medium; a High-tier
/// match short-circuits even when Medium keywords are also present.
/// Texts matching no keyword score Low. Matching is substring-based
/// on the lower-cased text, so multi-word phrases like "please help"
/// participate too.
///
/// # Arguments
/// * `text` - The feedback text to score
///
/// # Returns
/// An `Urgency` with the matched tier's label and fixed confidence
///
/// # Examples
/// ```ignore
/// let urgency = score("The app is broken, fix it ASAP");
/// assert_eq!(urgency.label, UrgencyLabel::High);
///
/// let urgency = score("Checkout is slow lately");
/// assert_eq!(urgency.label, UrgencyLabel::Medium);
/// ```
pub fn score(text: &str) -> Urgency {
    let text_lower = text.to_lowercase();

    if HIGH_KEYWORDS.iter().any(|k| text_lower.contains(k)) {
        Urgency {
            label: UrgencyLabel::High,
            prob: HIGH_CONFIDENCE,
        }
    } else if MEDIUM_KEYWORDS.iter().any(|k| text_lower.contains(k)) {
        Urgency {
            label: UrgencyLabel::Medium,
            prob: MEDIUM_CONFIDENCE,
        }
    } else {
        Urgency {
            label: UrgencyLabel::Low,
            prob: LOW_CONFIDENCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_tier_keywords() {
        assert_eq!(score("This is urgent, the site is down").label, UrgencyLabel::High);
        assert_eq!(score("App is BROKEN after the update").label, UrgencyLabel::High);
        assert_eq!(score("I cannot work until this is fixed").label, UrgencyLabel::High);
        assert_eq!(score("need a reply asap").label, UrgencyLabel::High);
    }

    #[test]
    fn test_medium_tier_keywords() {
        assert_eq!(score("The dashboard loads slow").label, UrgencyLabel::Medium);
        assert_eq!(score("There is an issue with exports"), Urgency {
            label: UrgencyLabel::Medium,
            prob: MEDIUM_CONFIDENCE,
        });
        assert_eq!(score("please help with my invoice").label, UrgencyLabel::Medium);
    }

    #[test]
    fn test_no_keywords_scores_low() {
        let urgency = score("Lovely release, thanks team");
        assert_eq!(urgency.label, UrgencyLabel::Low);
        assert_eq!(urgency.prob, LOW_CONFIDENCE);
        assert_eq!(score("").label, UrgencyLabel::Low);
    }

    #[test]
    fn test_high_beats_medium_when_both_present() {
        // "slow" is Medium-tier, "urgent" High-tier
        let urgency = score("The sync is slow and this is urgent");
        assert_eq!(urgency.label, UrgencyLabel::High);
        assert_eq!(urgency.prob, HIGH_CONFIDENCE);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(score("EMERGENCY: payments rejected").label, UrgencyLabel::High);
        assert_eq!(score("Quickly becoming unusable").label, UrgencyLabel::Medium);
    }

    #[test]
    fn test_confidences_are_fixed_per_tier() {
        assert_eq!(score("urgent").prob, HIGH_CONFIDENCE);
        assert_eq!(score("soon").prob, MEDIUM_CONFIDENCE);
        assert_eq!(score("fine").prob, LOW_CONFIDENCE);
    }
}
