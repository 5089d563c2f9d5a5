use crate::domain::model::RecordType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopilotError {
    #[error("No usable text after normalization")]
    EmptyInputError,

    #[error("Extraction yielded no skills and no titles for {record_type}")]
    EmptyRecordError { record_type: RecordType },

    #[error("Cannot match: {side} record has no skills")]
    InsufficientDataError { side: RecordType },

    #[error("Similarity provider unavailable: {message}")]
    EmbeddingUnavailableError { message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Pattern compilation failed: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Extraction,
    Matching,
    Provider,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl CopilotError {
    pub fn embedding_unavailable(message: impl Into<String>) -> Self {
        CopilotError::EmbeddingUnavailableError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        CopilotError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CopilotError::EmptyInputError => ErrorCategory::Input,
            CopilotError::EmptyRecordError { .. } | CopilotError::ProcessingError { .. } => {
                ErrorCategory::Extraction
            }
            CopilotError::InsufficientDataError { .. } => ErrorCategory::Matching,
            CopilotError::EmbeddingUnavailableError { .. } => ErrorCategory::Provider,
            CopilotError::ConfigValidationError { .. }
            | CopilotError::InvalidConfigValueError { .. }
            | CopilotError::PatternError(_) => ErrorCategory::Configuration,
            CopilotError::ZipError(_)
            | CopilotError::CsvError(_)
            | CopilotError::IoError(_)
            | CopilotError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// Severity drives the CLI exit code.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Provider => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Extraction | ErrorCategory::Matching => {
                ErrorSeverity::High
            }
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CopilotError::EmptyInputError => {
                "The document contains no readable text.".to_string()
            }
            CopilotError::EmptyRecordError { record_type } => format!(
                "No skills or job titles could be found in the {}.",
                record_type
            ),
            CopilotError::InsufficientDataError { side } => format!(
                "The {} has no recognizable skills, so no match score was computed.",
                side
            ),
            CopilotError::EmbeddingUnavailableError { .. } => {
                "The similarity service is unavailable.".to_string()
            }
            CopilotError::ConfigValidationError { field, .. }
            | CopilotError::InvalidConfigValueError { field, .. } => {
                format!("The configuration value '{}' is invalid.", field)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check that text extraction from the source file succeeded",
            ErrorCategory::Extraction => {
                "Make sure the document lists skills or experience, or extend the skill vocabulary"
            }
            ErrorCategory::Matching => "Provide a resume and job posting that both mention skills",
            ErrorCategory::Provider => {
                "Retry later, raise matcher.similarity_timeout_ms, or switch to the lexical provider"
            }
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::System => "Check file paths and permissions",
        }
    }
}

pub type Result<T> = std::result::Result<T, CopilotError>;
