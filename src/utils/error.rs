use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Required column '{column}' not found in input data")]
    MissingColumnError { column: String },

    #[error("Value '{value}' for {column} was not seen during training. Available values: {}", known.join(", "))]
    UnknownCategoryError {
        column: String,
        value: String,
        known: Vec<String>,
    },

    #[error("Model error: {message}")]
    ModelError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
    Model,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ChurnError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChurnError::ZipError(_) | ChurnError::IoError(_) => ErrorCategory::Io,
            ChurnError::CsvError(_)
            | ChurnError::SerializationError(_)
            | ChurnError::MissingColumnError { .. }
            | ChurnError::UnknownCategoryError { .. }
            | ChurnError::ProcessingError { .. } => ErrorCategory::Data,
            ChurnError::ConfigError { .. }
            | ChurnError::InvalidConfigValueError { .. }
            | ChurnError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            ChurnError::ModelError { .. } => ErrorCategory::Model,
            ChurnError::ValidationError { .. } => ErrorCategory::Validation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ChurnError::UnknownCategoryError { .. } | ChurnError::ValidationError { .. } => {
                ErrorSeverity::Medium
            }
            ChurnError::IoError(_) | ChurnError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Io => "Check that the input file exists and the output directory is writable",
            ErrorCategory::Data => match self {
                ChurnError::MissingColumnError { .. } => {
                    "Make sure the CSV export keeps the original column headers"
                }
                ChurnError::UnknownCategoryError { .. } => {
                    "Use one of the listed values or retrain the model on data containing it"
                }
                _ => "Inspect the input CSV for malformed rows or unexpected values",
            },
            ErrorCategory::Configuration => "Review the TOML configuration and command-line flags",
            ErrorCategory::Model => "Run the `train` command to produce a fresh model bundle",
            ErrorCategory::Validation => "Correct the reported value and run again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ChurnError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("File not found: {}", e)
            }
            ChurnError::MissingColumnError { column } => {
                format!("The input data has no '{}' column", column)
            }
            ChurnError::ModelError { message } => format!("Model problem: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChurnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_lists_known_values() {
        let err = ChurnError::UnknownCategoryError {
            column: "Contract".to_string(),
            value: "Weekly".to_string(),
            known: vec!["Month-to-month".to_string(), "One year".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("Weekly"));
        assert!(message.contains("Month-to-month, One year"));
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn io_errors_are_critical() {
        let err = ChurnError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "data.csv"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("File not found"));
    }

    #[test]
    fn empty_required_field_is_a_configuration_error() {
        let err = crate::utils::validation::validate_non_empty_string("data.id_column", " ").unwrap_err();
        assert!(matches!(err, ChurnError::InvalidConfigValueError { .. }));
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
