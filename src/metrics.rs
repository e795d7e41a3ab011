//! Dashboard metrics aggregation
//!
//! Pure, in-memory aggregation over one owner's records: summary
//! percentages, sentiment/urgency breakdowns, a fixed-width daily
//! trend, and the ranked critical list. Theme extraction happens
//! upstream; its report is passed in so the snapshot stays a pure
//! function of its inputs.

use crate::agent::themes::{ThemeOrigin, ThemeReport};
use crate::config::LimitsConfig;
use crate::record::{FeedbackRecord, SentimentLabel, UrgencyLabel};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request-scoped aggregate over one owner's records. Never persisted;
/// recomputed from the full record set on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub summary: Summary,
    pub charts: Charts,
    pub critical_feedback: Vec<CriticalItem>,
    pub themes: Vec<String>,
    pub theme_origin: ThemeOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub high_urgency_pct: f64,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charts {
    pub sentiment: SentimentCounts,
    pub urgency: UrgencyCounts,
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrgencyCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub count: usize,
}

/// One entry of the ranked critical list (Negative + High records).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalItem {
    pub id: String,
    pub text: String,
    pub timestamp: String,
    pub priority_score: u8,
}

/// Priority score of a critical record, 0..=10, higher = more critical.
/// Low confidence in the negative label and high urgency confidence both
/// push the score up.
pub fn priority_score(sentiment_prob: f32, urgency_prob: f32) -> u8 {
    (((1.0 - sentiment_prob) + urgency_prob) / 2.0 * 10.0).round() as u8
}

/// Aggregate one owner's records into a dashboard snapshot.
///
/// `today` anchors the trend window; passing it explicitly keeps the
/// function deterministic. Empty input yields total 0, zeroed
/// breakdowns, and a zero-filled trend of full width.
pub fn aggregate(
    records: &[FeedbackRecord],
    today: NaiveDate,
    limits: &LimitsConfig,
    themes: ThemeReport,
) -> MetricsSnapshot {
    let total = records.len();

    let mut sentiment = SentimentCounts::default();
    let mut urgency = UrgencyCounts::default();
    let mut score_sum = 0.0f64;
    for record in records {
        match record.sentiment_label {
            SentimentLabel::Positive => {
                sentiment.positive += 1;
                score_sum += record.sentiment_prob as f64;
            }
            SentimentLabel::Negative => {
                sentiment.negative += 1;
                score_sum -= record.sentiment_prob as f64;
            }
            SentimentLabel::Neutral => sentiment.neutral += 1,
        }
        match record.urgency_label {
            UrgencyLabel::High => urgency.high += 1,
            UrgencyLabel::Medium => urgency.medium += 1,
            UrgencyLabel::Low => urgency.low += 1,
        }
    }

    let pct = |count: usize| {
        if total > 0 {
            count as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    };
    let summary = Summary {
        total,
        high_urgency_pct: pct(urgency.high),
        positive_pct: pct(sentiment.positive),
        negative_pct: pct(sentiment.negative),
        avg_score: if total > 0 {
            score_sum / total as f64
        } else {
            0.0
        },
    };

    MetricsSnapshot {
        summary,
        charts: Charts {
            sentiment,
            urgency,
            trend: trend(records, today, limits.trend_days),
        },
        critical_feedback: critical(records, limits.critical_limit),
        themes: themes.themes,
        theme_origin: themes.origin,
    }
}

/// Daily counts for the trailing window ending today, oldest first.
/// Days with no records report 0 rather than being omitted.
fn trend(records: &[FeedbackRecord], today: NaiveDate, days: i64) -> Vec<TrendPoint> {
    let mut by_date: HashMap<NaiveDate, usize> = HashMap::new();
    for record in records {
        *by_date.entry(record.created_at.date_naive()).or_insert(0) += 1;
    }

    (0..days)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            TrendPoint {
                date: date.format("%m-%d").to_string(),
                count: by_date.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Negative + High records, scored, sorted by score descending with
/// ties broken by most recent timestamp, capped at `limit`.
fn critical(records: &[FeedbackRecord], limit: usize) -> Vec<CriticalItem> {
    let mut ranked: Vec<&FeedbackRecord> = records
        .iter()
        .filter(|r| {
            r.sentiment_label == SentimentLabel::Negative && r.urgency_label == UrgencyLabel::High
        })
        .collect();
    ranked.sort_by(|a, b| {
        priority_score(b.sentiment_prob, b.urgency_prob)
            .cmp(&priority_score(a.sentiment_prob, a.urgency_prob))
            .then(b.created_at.cmp(&a.created_at))
    });
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|r| CriticalItem {
            id: r.id.clone(),
            text: r.text.clone(),
            timestamp: r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            priority_score: priority_score(r.sentiment_prob, r.urgency_prob),
        })
        .collect()
}
