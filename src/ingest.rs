//! CSV ingestion: one file, one domain tag, one owner.
//!
//! The text column is found by header name (`feedback` or `text`,
//! case-insensitive). Blank cells are skipped and counted, never
//! errors. Ragged rows are tolerated: extra unquoted fields are
//! ignored and a short row reads as blank. Bad UTF-8 or a missing
//! text column surfaces as a `Validation` error for the whole file.

use std::io::Read;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TriageError};
use crate::pipeline::FeedbackAnalyzer;
use crate::storage::FeedbackStore;

/// Header names accepted for the feedback text column.
pub const TEXT_COLUMNS: &[&str] = &["feedback", "text"];

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Reads a feedback CSV, analyzes every non-blank row, and stores the
/// resulting records.
pub async fn ingest_feedback<R: Read>(
    analyzer: &FeedbackAnalyzer,
    store: &dyn FeedbackStore,
    reader: R,
    domain: &str,
    owner_id: &str,
) -> Result<IngestSummary> {
    if owner_id.trim().is_empty() {
        return Err(TriageError::Validation {
            message: "owner id is required".into(),
        });
    }

    // flexible: feedback text often carries unquoted commas; a ragged
    // row must not fail the whole file
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let text_idx = headers
        .iter()
        .position(|h| {
            TEXT_COLUMNS
                .iter()
                .any(|name| h.trim().eq_ignore_ascii_case(name))
        })
        .ok_or_else(|| TriageError::Validation {
            message: format!(
                "no feedback column found (expected one of: {})",
                TEXT_COLUMNS.join(", ")
            ),
        })?;

    let mut processed = 0usize;
    let mut skipped = 0usize;

    for row in rdr.records() {
        let row = row?;
        let cell = row.get(text_idx).unwrap_or("");
        if cell.trim().is_empty() {
            skipped += 1;
            continue;
        }

        match analyzer.analyze(cell, domain, owner_id) {
            Ok(record) => {
                store.insert(&record).await?;
                processed += 1;
            }
            Err(TriageError::Validation { message }) => {
                warn!(%message, "skipping unprocessable row");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(processed, skipped, %domain, "CSV ingestion finished");
    Ok(IngestSummary { processed, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleEngine;
    use crate::sentiment::{LexiconSentimentModel, SentimentClassifier};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn analyzer() -> FeedbackAnalyzer {
        FeedbackAnalyzer::new(
            Arc::new(SentimentClassifier::with_backend(Box::new(
                LexiconSentimentModel,
            ))),
            RuleEngine::default(),
        )
    }

    #[tokio::test]
    async fn test_ingest_happy_path() {
        let store = MemoryStore::new();
        let csv =
            "feedback\n\"My account is locked, this is urgent!\"\n\"The app is great, thanks!\"\n";
        let summary = ingest_feedback(&analyzer(), &store, csv.as_bytes(), "banking", "user-1")
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 0);
        let records = store.records_for_owner("user-1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.domain == "banking"));
        assert!(
            records
                .iter()
                .any(|r| r.text == "My account is locked, this is urgent!")
        );
    }

    #[tokio::test]
    async fn test_unquoted_comma_keeps_the_first_field() {
        let store = MemoryStore::new();
        // ragged row: the unquoted comma splits the text, only the first
        // field lands in the feedback column
        let csv = "feedback\nMy refund never arrived, please help\n";
        let summary = ingest_feedback(&analyzer(), &store, csv.as_bytes(), "ecommerce", "user-1")
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        let records = store.records_for_owner("user-1").await.unwrap();
        assert_eq!(records[0].text, "My refund never arrived");
    }

    #[tokio::test]
    async fn test_text_column_accepted_case_insensitively() {
        let store = MemoryStore::new();
        let csv = "source,Text\nemail,works well\n";
        let summary = ingest_feedback(&analyzer(), &store, csv.as_bytes(), "general", "user-1")
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        let records = store.records_for_owner("user-1").await.unwrap();
        assert_eq!(records[0].text, "works well");
    }

    #[tokio::test]
    async fn test_blank_cells_are_skipped() {
        let store = MemoryStore::new();
        let csv = "feedback,source\n,email\n   ,web\ngreat app,web\n";
        let summary = ingest_feedback(&analyzer(), &store, csv.as_bytes(), "general", "user-1")
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_missing_feedback_column_is_rejected() {
        let store = MemoryStore::new();
        let csv = "comment\nhello\n";
        let err = ingest_feedback(&analyzer(), &store, csv.as_bytes(), "general", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_blank_owner_is_rejected_up_front() {
        let store = MemoryStore::new();
        let csv = "feedback\nhello\n";
        let err = ingest_feedback(&analyzer(), &store, csv.as_bytes(), "general", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_validation_error() {
        let store = MemoryStore::new();
        let bytes: &[u8] = b"feedback\n\xff\xfe broken\n";
        let err = ingest_feedback(&analyzer(), &store, bytes, "general", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation { .. }));
    }
}
