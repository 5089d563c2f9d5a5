pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
pub use config::toml_config::{load_requirements, CopilotConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::engine::{BatchOutcome, CopilotEngine, Evaluation, Requirements, ResumeInput};
pub use core::matcher::{MatcherSettings, SkillMatcher};
pub use core::parser::{DocumentParser, ParserSettings};
pub use core::report::ReportWriter;
pub use core::similarity::{HttpEmbeddingProvider, LexicalSimilarity};
pub use core::vocabulary::SkillVocabulary;
pub use domain::model::{CanonicalRecord, MatchReport, RecordType, SkillRequirements};
pub use domain::ports::{SimilarityProvider, Storage};
pub use utils::error::{CopilotError, Result};
