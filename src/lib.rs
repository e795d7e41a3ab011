//! Customer feedback triage: sentiment + urgency analysis, domain rules,
//! persistence, and dashboard metrics, with optional generated themes and
//! insights.

pub mod agent;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod rules;
pub mod sentiment;
pub mod storage;
pub mod urgency;

use std::io::Read;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::agent::{Insight, InsightGenerator, TextGenerator, ThemeExtractor, create_generator};
use crate::config::{Config, LimitsConfig};
use crate::error::{Result, TriageError};
use crate::ingest::IngestSummary;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::FeedbackAnalyzer;
use crate::record::FeedbackRecord;
use crate::storage::{FeedbackStore, SqliteStore};

/// The wired-up triage system: analyzer, store, and the optional
/// generation-backed collaborators. One instance per process.
pub struct TriageService {
    analyzer: FeedbackAnalyzer,
    store: Arc<dyn FeedbackStore>,
    themes: ThemeExtractor,
    insights: InsightGenerator,
    limits: LimitsConfig,
}

impl TriageService {
    /// Wires every component from config: sentiment backend per
    /// `[system]`, SQLite store at the configured path, generator if an
    /// API key is present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let analyzer = FeedbackAnalyzer::from_config(config);
        let store: Arc<dyn FeedbackStore> =
            Arc::new(SqliteStore::open(&config.system.database_path)?);
        Ok(Self::new(analyzer, store, config))
    }

    /// Explicit analyzer and store, generator from config.
    pub fn new(analyzer: FeedbackAnalyzer, store: Arc<dyn FeedbackStore>, config: &Config) -> Self {
        Self::with_generator(analyzer, store, create_generator(config), config)
    }

    /// Fully explicit wiring, used by tests to substitute the generator.
    pub fn with_generator(
        analyzer: FeedbackAnalyzer,
        store: Arc<dyn FeedbackStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        config: &Config,
    ) -> Self {
        Self {
            analyzer,
            store,
            themes: ThemeExtractor::new(generator.clone(), config),
            insights: InsightGenerator::new(generator, config),
            limits: config.limits.clone(),
        }
    }

    /// Runs the pipeline on one text without persisting the result.
    pub fn analyze(&self, text: &str, domain: &str, owner_id: &str) -> Result<FeedbackRecord> {
        self.analyzer.analyze(text, domain, owner_id)
    }

    /// Analyzes one text and stores the record.
    pub async fn submit(&self, text: &str, domain: &str, owner_id: &str) -> Result<FeedbackRecord> {
        let record = self.analyzer.analyze(text, domain, owner_id)?;
        self.store.insert(&record).await?;
        Ok(record)
    }

    /// Ingests a feedback CSV under one domain tag and owner.
    pub async fn ingest_csv<R: Read>(
        &self,
        reader: R,
        domain: &str,
        owner_id: &str,
    ) -> Result<IngestSummary> {
        ingest::ingest_feedback(&self.analyzer, self.store.as_ref(), reader, domain, owner_id)
            .await
    }

    /// Builds the dashboard snapshot for one owner, anchored at the
    /// current UTC date.
    pub async fn dashboard(&self, owner_id: &str) -> Result<MetricsSnapshot> {
        self.dashboard_at(owner_id, Utc::now().date_naive()).await
    }

    /// Dashboard snapshot with an explicit trend anchor date.
    pub async fn dashboard_at(&self, owner_id: &str, today: NaiveDate) -> Result<MetricsSnapshot> {
        let records = self.store.records_for_owner(owner_id).await?;
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let themes = self.themes.extract(&texts).await;
        Ok(metrics::aggregate(&records, today, &self.limits, themes))
    }

    /// Generates a recommendation for one stored record.
    pub async fn insight(&self, record_id: &str) -> Result<Insight> {
        let record =
            self.store
                .get(record_id)
                .await?
                .ok_or_else(|| TriageError::Validation {
                    message: format!("no feedback record with id {record_id}"),
                })?;
        Ok(self.insights.recommend(&record.text).await)
    }
}
