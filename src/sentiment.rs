//! Sentiment classification backends and the degrading classifier service.
//!
//! Two backends: a candle BERT classifier loaded from a local model
//! directory, and a deterministic lexicon scorer for dev and tests.
//! The `SentimentClassifier` wrapper is constructed once per process
//! and absorbs every backend failure into the fixed neutral fallback.

use crate::config::SentimentConfig;
use crate::error::TriageError;
use crate::record::{Sentiment, SentimentLabel, SignalOrigin};
use anyhow::{Context, Result};
use candle_core::{D, Device, Tensor};
use candle_nn::ops::softmax;
use candle_nn::{Linear, Module, VarBuilder, linear};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

pub trait SentimentBackend: Send + Sync {
    /// Classify one text into (label, confidence of that label).
    fn classify(&self, text: &str) -> Result<(SentimentLabel, f32)>;
    fn name(&self) -> &'static str;
}

/// Classifier head metadata read from the model directory's config.json.
/// Parsed separately from the encoder config so the head can be wired
/// without depending on the encoder type's internals.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    #[serde(default)]
    id2label: Option<HashMap<String, String>>,
}

// Candle BERT implementation
pub struct CandleSentimentModel {
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    tokenizer: tokenizers::Tokenizer,
    labels: [SentimentLabel; 3],
    max_tokens: usize,
    device: Device,
}

impl CandleSentimentModel {
    /// Load a three-class BERT sentiment checkpoint from a local directory
    /// containing tokenizer.json, config.json, and model.safetensors.
    pub fn new(model_dir: &Path, max_tokens: usize) -> Result<Self> {
        let device = Device::Cpu;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let config_path = model_dir.join("config.json");
        let config_str =
            std::fs::read_to_string(&config_path).context("Failed to read config.json")?;
        let config: BertConfig =
            serde_json::from_str(&config_str).context("Failed to parse config.json")?;
        let head: HeadConfig =
            serde_json::from_str(&config_str).context("Failed to parse classifier head config")?;

        let weights_path = model_dir.join("model.safetensors");
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], candle_core::DType::F32, &device)?
        };

        // Classification exports prefix encoder tensors with the model type
        let prefixed = vb.contains_tensor("bert.embeddings.word_embeddings.weight");
        let pooler_pp = if prefixed {
            vb.pp("bert").pp("pooler").pp("dense")
        } else {
            vb.pp("pooler").pp("dense")
        };
        let pooler = if pooler_pp.contains_tensor("weight") {
            Some(linear(head.hidden_size, head.hidden_size, pooler_pp)?)
        } else {
            None
        };
        let classifier = linear(head.hidden_size, 3, vb.pp("classifier"))?;
        let model = BertModel::load(if prefixed { vb.pp("bert") } else { vb }, &config)?;

        let labels = label_order(head.id2label.as_ref());

        Ok(Self {
            model,
            pooler,
            classifier,
            tokenizer,
            labels,
            max_tokens: max_tokens.max(2),
            device,
        })
    }
}

impl SentimentBackend for CandleSentimentModel {
    fn classify(&self, text: &str) -> Result<(SentimentLabel, f32)> {
        debug!("Classifying sentiment ({} chars)", text.len());

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        // Truncate overlong input instead of failing; slicing the id and
        // mask streams together keeps them aligned
        let token_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();
        let keep = token_ids.len().min(self.max_tokens);
        if keep == 0 {
            anyhow::bail!("Empty encoding for sentiment input");
        }
        let token_ids = &token_ids[..keep];
        let attention_mask = &attention_mask[..keep];
        let type_ids = vec![0u32; keep];

        let input_ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_tensor = Tensor::new(
            attention_mask
                .iter()
                .map(|&x| x as f32)
                .collect::<Vec<_>>()
                .as_slice(),
            &self.device,
        )?
        .unsqueeze(0)?;

        let encoded = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_tensor))?;

        // [CLS] token state, through the pooler when the export carries one
        let cls = encoded.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = match &self.pooler {
            Some(p) => p.forward(&cls)?.tanh()?,
            None => cls,
        };
        let logits = self.classifier.forward(&pooled)?;
        let probs = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?;

        let (best_idx, best_prob) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, p)| (i, *p))
            .context("Empty probability distribution")?;
        let label = self
            .labels
            .get(best_idx)
            .copied()
            .unwrap_or(SentimentLabel::Neutral);

        Ok((label, best_prob))
    }

    fn name(&self) -> &'static str {
        "candle"
    }
}

/// Map the checkpoint's id2label table onto our label enum, falling back
/// to the conventional negative/neutral/positive index order when the
/// table is absent or uses opaque names.
fn label_order(id2label: Option<&HashMap<String, String>>) -> [SentimentLabel; 3] {
    let mut order = SentimentLabel::ALL;
    if let Some(map) = id2label {
        for (idx, slot) in order.iter_mut().enumerate() {
            if let Some(name) = map.get(&idx.to_string())
                && let Some(label) = parse_label_name(name)
            {
                *slot = label;
            }
        }
    }
    order
}

fn parse_label_name(name: &str) -> Option<SentimentLabel> {
    let lower = name.to_lowercase();
    if lower.contains("neg") {
        Some(SentimentLabel::Negative)
    } else if lower.contains("pos") {
        Some(SentimentLabel::Positive)
    } else if lower.contains("neu") {
        Some(SentimentLabel::Neutral)
    } else {
        None
    }
}

// Deterministic, local lexicon backend for testing/dev (no model files)
pub struct LexiconSentimentModel;

/// Stems counted as positive signal (substring match on lowered text)
pub const POSITIVE_STEMS: &[&str] = &[
    "great", "love", "excellent", "amazing", "helpful", "fantastic", "perfect", "easy", "smooth",
    "thank",
];

/// Stems counted as negative signal
pub const NEGATIVE_STEMS: &[&str] = &[
    "locked", "urgent", "broken", "crash", "terrible", "awful", "useless", "slow", "error", "fail",
    "fraud", "worst", "cannot", "problem", "hate", "damaged",
];

impl SentimentBackend for LexiconSentimentModel {
    fn classify(&self, text: &str) -> Result<(SentimentLabel, f32)> {
        let lower = text.to_lowercase();
        let pos = POSITIVE_STEMS.iter().filter(|s| lower.contains(*s)).count();
        let neg = NEGATIVE_STEMS.iter().filter(|s| lower.contains(*s)).count();

        if pos == neg {
            return Ok((SentimentLabel::Neutral, 0.5));
        }
        let total = (pos + neg) as f32;
        let margin = (pos.abs_diff(neg)) as f32 / total;
        let prob = 0.5 + 0.4 * margin;
        let label = if pos > neg {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        };
        Ok((label, prob))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// The process-wide sentiment service. Built once at startup; a backend
/// that fails to load leaves the service in degraded mode, where every
/// call returns the fixed neutral fallback instead of an error.
pub struct SentimentClassifier {
    backend: Option<Box<dyn SentimentBackend>>,
}

impl SentimentClassifier {
    pub fn from_config(cfg: &SentimentConfig) -> Self {
        match build_backend(cfg) {
            Ok(backend) => {
                info!("Sentiment backend ready (provider={})", backend.name());
                Self {
                    backend: Some(backend),
                }
            }
            Err(e) => {
                warn!("Sentiment backend unavailable, running degraded: {}", e);
                Self { backend: None }
            }
        }
    }

    pub fn with_backend(backend: Box<dyn SentimentBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A classifier with no backend; every call yields the fallback.
    pub fn degraded() -> Self {
        Self { backend: None }
    }

    pub fn is_degraded(&self) -> bool {
        self.backend.is_none()
    }

    /// Classify one text. Never fails: backend errors degrade to the
    /// fixed `{Neutral, 0.5}` fallback, tagged with the reason.
    pub fn classify(&self, text: &str) -> Sentiment {
        let Some(backend) = &self.backend else {
            return Sentiment::fallback(SignalOrigin::ModelUnavailable);
        };
        match backend.classify(text) {
            Ok((label, prob)) => Sentiment {
                label,
                prob: prob.clamp(0.0, 1.0),
                origin: SignalOrigin::Model,
            },
            Err(e) => {
                warn!("Sentiment classification failed, using fallback: {}", e);
                Sentiment::fallback(SignalOrigin::InferenceFailed)
            }
        }
    }
}

// Factory function to create a backend from configuration
fn build_backend(cfg: &SentimentConfig) -> Result<Box<dyn SentimentBackend>, TriageError> {
    match cfg.provider.as_str() {
        "candle" | "local" => {
            let dir = cfg
                .model_dir
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| TriageError::ModelUnavailable {
                    message: format!("provider '{}' requires model_dir", cfg.provider),
                })?;
            let model = CandleSentimentModel::new(Path::new(dir), cfg.max_tokens).map_err(|e| {
                TriageError::ModelUnavailable {
                    message: e.to_string(),
                }
            })?;
            Ok(Box::new(model))
        }
        "lexicon" => Ok(Box::new(LexiconSentimentModel)),
        other => Err(TriageError::ModelUnavailable {
            message: format!("unknown provider '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicon_negative() {
        let (label, prob) = LexiconSentimentModel
            .classify("My account is locked, this is urgent!")
            .unwrap();
        assert_eq!(label, SentimentLabel::Negative);
        assert!(prob > 0.85 && prob <= 1.0);
    }

    #[test]
    fn test_lexicon_positive() {
        let (label, prob) = LexiconSentimentModel
            .classify("The app is great, thanks!")
            .unwrap();
        assert_eq!(label, SentimentLabel::Positive);
        assert!(prob > 0.85);
    }

    #[test]
    fn test_lexicon_neutral_when_balanced() {
        let (label, prob) = LexiconSentimentModel
            .classify("Signup was easy but checkout is slow")
            .unwrap();
        assert_eq!(label, SentimentLabel::Neutral);
        assert_eq!(prob, 0.5);

        let (label, prob) = LexiconSentimentModel.classify("Delivery update").unwrap();
        assert_eq!(label, SentimentLabel::Neutral);
        assert_eq!(prob, 0.5);
    }

    #[test]
    fn test_degraded_classifier_returns_exact_fallback() {
        let classifier = SentimentClassifier::degraded();
        assert!(classifier.is_degraded());
        let result = classifier.classify("anything at all");
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert_eq!(result.prob, 0.5);
        assert_eq!(result.origin, SignalOrigin::ModelUnavailable);
    }

    struct FailingBackend;

    impl SentimentBackend for FailingBackend {
        fn classify(&self, _text: &str) -> Result<(SentimentLabel, f32)> {
            Err(anyhow::anyhow!("inference blew up"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_backend_error_falls_back_with_inference_tag() {
        let classifier = SentimentClassifier::with_backend(Box::new(FailingBackend));
        assert!(!classifier.is_degraded());
        let result = classifier.classify("some feedback");
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert_eq!(result.prob, 0.5);
        assert_eq!(result.origin, SignalOrigin::InferenceFailed);
    }

    #[test]
    fn test_missing_model_dir_degrades() {
        let cfg = SentimentConfig {
            provider: "candle".to_string(),
            model_dir: Some("/nonexistent/sentiment-model".to_string()),
            max_tokens: 512,
        };
        let classifier = SentimentClassifier::from_config(&cfg);
        assert!(classifier.is_degraded());
        assert_eq!(classifier.classify("text").origin, SignalOrigin::ModelUnavailable);
    }

    #[test]
    fn test_unknown_provider_degrades() {
        let cfg = SentimentConfig {
            provider: "quantum".to_string(),
            model_dir: None,
            max_tokens: 512,
        };
        assert!(SentimentClassifier::from_config(&cfg).is_degraded());
    }

    #[test]
    fn test_lexicon_provider_from_config() {
        let cfg = SentimentConfig {
            provider: "lexicon".to_string(),
            model_dir: None,
            max_tokens: 512,
        };
        let classifier = SentimentClassifier::from_config(&cfg);
        assert!(!classifier.is_degraded());
        let result = classifier.classify("fantastic support, thank you");
        assert_eq!(result.label, SentimentLabel::Positive);
        assert_eq!(result.origin, SignalOrigin::Model);
    }

    #[test]
    fn test_label_order_respects_id2label() {
        let mut map = HashMap::new();
        map.insert("0".to_string(), "positive".to_string());
        map.insert("1".to_string(), "neutral".to_string());
        map.insert("2".to_string(), "negative".to_string());
        let order = label_order(Some(&map));
        assert_eq!(order[0], SentimentLabel::Positive);
        assert_eq!(order[2], SentimentLabel::Negative);
    }

    #[test]
    fn test_label_order_defaults_on_opaque_names() {
        let mut map = HashMap::new();
        map.insert("0".to_string(), "LABEL_0".to_string());
        map.insert("1".to_string(), "LABEL_1".to_string());
        let order = label_order(Some(&map));
        assert_eq!(order, SentimentLabel::ALL);
        assert_eq!(label_order(None), SentimentLabel::ALL);
    }

    // Requires a local BERT sentiment checkpoint; see TRIAGE_MODEL_DIR
    #[cfg(feature = "model_integration")]
    #[test]
    fn test_candle_checkpoint_classifies() {
        let dir = std::env::var("TRIAGE_MODEL_DIR").expect("TRIAGE_MODEL_DIR must be set");
        let model = CandleSentimentModel::new(Path::new(&dir), 512).expect("model should load");
        let (label, prob) = model.classify("This is absolutely terrible").unwrap();
        assert_eq!(label, SentimentLabel::Negative);
        assert!((0.0..=1.0).contains(&prob));
    }
}
