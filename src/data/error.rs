use thiserror::Error;

// ---------------------------------------------------------------------------
// Per-file error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong while sweeping a single uploaded file.
///
/// None of these abort the batch: the pipeline records the error on the
/// file's report and moves on to the next file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    #[error("unsupported file type: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("could not parse {file}: {message}")]
    ParseFailure { file: String, message: String },

    #[error("column '{0}' does not exist")]
    UnknownColumn(String),

    #[error("select at least one column to convert")]
    EmptySelection,

    #[error("could not convert {file}: {message}")]
    ConversionFailure { file: String, message: String },
}

impl SweepError {
    pub fn parse(file: &str, err: anyhow::Error) -> Self {
        SweepError::ParseFailure {
            file: file.to_string(),
            message: format!("{err:#}"),
        }
    }

    pub fn conversion(file: &str, err: anyhow::Error) -> Self {
        SweepError::ConversionFailure {
            file: file.to_string(),
            message: format!("{err:#}"),
        }
    }
}
