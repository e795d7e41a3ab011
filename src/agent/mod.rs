//! External text-generation agent
//!
//! The narrow `generate(prompt) -> text` contract, its Gemini REST
//! provider, and the two consumers: batch theme extraction and
//! per-record insight recommendations. Both consumers treat the
//! service as unreliable and carry deterministic fallbacks.

pub mod generate;
pub mod insight;
pub mod themes;

pub use generate::{FakeGenerator, GeminiGenerator, TextGenerator, create_generator};
pub use insight::{Insight, InsightGenerator, InsightOrigin};
pub use themes::{ThemeExtractor, ThemeOrigin, ThemeReport};
