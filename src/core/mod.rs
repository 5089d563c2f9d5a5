pub mod details;
pub mod engine;
pub mod extractor;
pub mod matcher;
pub mod normalizer;
pub mod parser;
pub mod record_builder;
pub mod report;
pub mod segmenter;
pub mod similarity;
pub mod vocabulary;

pub use crate::domain::model::{CanonicalRecord, MatchReport, RecordType, SkillRequirements};
pub use crate::domain::ports::{SimilarityProvider, Storage};
pub use crate::utils::error::Result;
