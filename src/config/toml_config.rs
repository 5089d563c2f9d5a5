use crate::core::engine::CopilotEngine;
use crate::core::matcher::{MatcherSettings, SkillMatcher};
use crate::core::parser::{DocumentParser, ParserSettings};
use crate::core::similarity::{HttpEmbeddingProvider, LexicalSimilarity};
use crate::core::vocabulary::SkillVocabulary;
use crate::domain::model::SkillRequirements;
use crate::domain::ports::SimilarityProvider;
use crate::utils::error::{CopilotError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopilotConfig {
    pub normalizer: NormalizerConfig,
    pub segmenter: SegmenterConfig,
    pub extractor: ExtractorConfig,
    pub matcher: MatcherConfig,
    pub similarity: SimilarityConfig,
    pub vocabulary: VocabularyConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub repeated_line_threshold: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            repeated_line_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub max_heading_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_heading_chars: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub fuzzy_min_token_chars: usize,
    pub max_edit_distance: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fuzzy_min_token_chars: 5,
            max_edit_distance: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub semantic_threshold: f32,
    pub required_weight: f64,
    pub nice_to_have_weight: f64,
    pub similarity_timeout_ms: u64,
    pub concurrent_requests: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.75,
            required_weight: 2.0,
            nice_to_have_weight: 1.0,
            similarity_timeout_ms: 2_000,
            concurrent_requests: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Lexical,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub provider: ProviderKind,
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Lexical,
            endpoint: None,
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Replaces the built-in skill vocabulary when set.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
        }
    }
}

impl CopilotConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CopilotError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CopilotError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left
    /// as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn parser_settings(&self) -> ParserSettings {
        ParserSettings {
            repeated_line_threshold: self.normalizer.repeated_line_threshold,
            max_heading_chars: self.segmenter.max_heading_chars,
            fuzzy_min_token_chars: self.extractor.fuzzy_min_token_chars,
            max_edit_distance: self.extractor.max_edit_distance,
        }
    }

    pub fn matcher_settings(&self) -> MatcherSettings {
        MatcherSettings {
            semantic_threshold: self.matcher.semantic_threshold,
            required_weight: self.matcher.required_weight,
            nice_to_have_weight: self.matcher.nice_to_have_weight,
            similarity_timeout: Duration::from_millis(self.matcher.similarity_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.similarity.request_timeout_seconds)
    }

    pub fn output_path(&self) -> &str {
        &self.output.output_path
    }

    pub fn concurrent_requests(&self) -> usize {
        self.matcher.concurrent_requests
    }

    pub fn load_vocabulary(&self) -> Result<SkillVocabulary> {
        match &self.vocabulary.path {
            Some(path) => {
                tracing::info!("Loading skill vocabulary from {}", path);
                SkillVocabulary::from_file(path)
            }
            None => SkillVocabulary::builtin(),
        }
    }

    pub fn build_provider(&self) -> Result<Box<dyn SimilarityProvider>> {
        match self.similarity.provider {
            ProviderKind::Lexical => Ok(Box::new(LexicalSimilarity::new())),
            ProviderKind::Http => {
                let endpoint = self.similarity.endpoint.as_deref().unwrap_or_default();
                Ok(Box::new(HttpEmbeddingProvider::new(
                    endpoint,
                    &self.similarity.model,
                    self.similarity.api_key.clone(),
                    self.request_timeout(),
                )?))
            }
        }
    }

    pub fn build_engine(&self) -> Result<CopilotEngine<Box<dyn SimilarityProvider>>> {
        let vocabulary = Arc::new(self.load_vocabulary()?);
        tracing::debug!(
            "Skill vocabulary {} with {} skills",
            vocabulary.version(),
            vocabulary.len()
        );
        let parser = DocumentParser::new(vocabulary, self.parser_settings())?;
        let matcher = SkillMatcher::new(self.build_provider()?, self.matcher_settings());
        Ok(CopilotEngine::new(parser, matcher, self.concurrent_requests()))
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number(
            "normalizer.repeated_line_threshold",
            self.normalizer.repeated_line_threshold,
            2,
        )?;
        validate_positive_number(
            "segmenter.max_heading_chars",
            self.segmenter.max_heading_chars,
            1,
        )?;
        validate_positive_number(
            "extractor.fuzzy_min_token_chars",
            self.extractor.fuzzy_min_token_chars,
            1,
        )?;
        validate_range("extractor.max_edit_distance", self.extractor.max_edit_distance, 0, 3)?;

        validate_range("matcher.semantic_threshold", self.matcher.semantic_threshold, 0.0, 1.0)?;
        for (field, weight) in [
            ("matcher.required_weight", self.matcher.required_weight),
            ("matcher.nice_to_have_weight", self.matcher.nice_to_have_weight),
        ] {
            validate_range(field, weight, 0.0, 100.0)?;
            // A zero weight lets a report reach 1.0 with listed skills missing.
            if weight <= 0.0 {
                return Err(CopilotError::ConfigValidationError {
                    field: field.to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        validate_positive_number(
            "matcher.similarity_timeout_ms",
            self.matcher.similarity_timeout_ms as usize,
            1,
        )?;
        validate_positive_number(
            "matcher.concurrent_requests",
            self.matcher.concurrent_requests,
            1,
        )?;

        if self.similarity.provider == ProviderKind::Http {
            let endpoint = self.similarity.endpoint.as_deref().ok_or_else(|| {
                CopilotError::ConfigValidationError {
                    field: "similarity.endpoint".to_string(),
                    message: "required when provider = \"http\"".to_string(),
                }
            })?;
            validate_url("similarity.endpoint", endpoint)?;
            validate_non_empty_string("similarity.model", &self.similarity.model)?;
            validate_positive_number(
                "similarity.request_timeout_seconds",
                self.similarity.request_timeout_seconds as usize,
                1,
            )?;
        }

        if let Some(path) = &self.vocabulary.path {
            validate_path("vocabulary.path", path)?;
        }
        validate_path("output.output_path", &self.output.output_path)?;

        Ok(())
    }
}

/// Reads `required` / `nice_to_have` skill lists from a `.json` file, or from
/// TOML for any other extension.
pub fn load_requirements<P: AsRef<Path>>(path: P) -> Result<SkillRequirements> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(CopilotError::IoError)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        return Ok(serde_json::from_str(&content)?);
    }
    toml::from_str(&content).map_err(|e| CopilotError::ConfigValidationError {
        field: "requirements".to_string(),
        message: format!("TOML parsing error: {}", e),
    })
}

impl Validate for CopilotConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
