use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
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

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data validation error in {dataset}: {message}")]
    DataValidationError { dataset: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    DataValidation,
    Storage,
    Serialization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn data_validation(dataset: &str, message: impl Into<String>) -> Self {
        EtlError::DataValidationError {
            dataset: dataset.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::DataValidationError { .. } | EtlError::CsvError(_) => {
                ErrorCategory::DataValidation
            }
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Storage,
            EtlError::SerializationError(_) => ErrorCategory::Serialization,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::DataValidation => ErrorSeverity::High,
            ErrorCategory::Storage | ErrorCategory::Serialization => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ConfigError { .. } | EtlError::ConfigValidationError { .. } => {
                "Check the configuration file syntax and required sections".to_string()
            }
            EtlError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' and retry", field)
            }
            EtlError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            EtlError::DataValidationError { dataset, .. } => format!(
                "Inspect the {} input file: required columns must exist and dates must be parseable",
                dataset
            ),
            EtlError::CsvError(_) => {
                "Make sure the transactions file is a comma-separated file with a header row"
                    .to_string()
            }
            EtlError::IoError(_) => {
                "Verify that input files exist and the output directory is writable".to_string()
            }
            EtlError::ZipError(_) => "Disable compression or free up disk space".to_string(),
            EtlError::SerializationError(_) => {
                "Make sure the clients file is a JSON array of objects".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::DataValidation => format!("Input data is invalid: {}", self),
            ErrorCategory::Storage => format!("Could not read or write files: {}", self),
            ErrorCategory::Serialization => format!("Could not parse or encode data: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
