use thiserror::Error;

use crate::duration::DurationError;
use crate::model::ModelError;

#[derive(Error, Debug)]
pub enum CallsightError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Row {row}: invalid {column} value '{value}': {reason}")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
        reason: String,
    },

    #[error("Row {row}: {source}")]
    Duration {
        row: usize,
        #[source]
        source: DurationError,
    },

    #[error("Unseen {field} '{value}': not present in the fitted dataset")]
    UnseenCategory { field: &'static str, value: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown {field} id {id}")]
    UnknownId { field: &'static str, id: u32 },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl CallsightError {
    /// True for errors caused by user input rather than the dataset or model.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CallsightError::UnseenCategory { .. } | CallsightError::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CallsightError>;
