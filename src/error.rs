// ⚠️ Error types
// Configuration errors are reported synchronously; insufficient history is never an error.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for vahan-insights operations.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // CONFIGURATION ERRORS (caller supplied something malformed)
    // ========================================================================
    /// Dimension-key list was empty.
    #[error("at least one dimension key is required")]
    NoDimensions,

    /// Dimension key does not name a categorical record field.
    #[error("unknown dimension key '{0}' (expected one of: vehicle_category, manufacturer)")]
    UnknownDimension(String),

    /// Same dimension key listed twice.
    #[error("dimension key '{0}' listed more than once")]
    DuplicateDimension(String),

    /// Growth requested with a different key set than the table was grouped by.
    #[error("dimension keys {requested:?} do not match table grouping columns {table:?}")]
    DimensionMismatch {
        /// Keys supplied to the growth calculator.
        requested: Vec<String>,
        /// Keys the aggregate table was built with.
        table: Vec<String>,
    },

    /// Period lag of zero (or otherwise unusable).
    #[error("invalid {name} lag {lag}: must be at least 1 period")]
    InvalidLag {
        /// Which lag ("qoq" or "yoy").
        name: &'static str,
        /// The rejected value.
        lag: usize,
    },

    /// Record failed schema checks.
    #[error("invalid record{}: {}", .line.map(|l| format!(" at line {l}")).unwrap_or_default(), .message)]
    InvalidRecord {
        /// CSV line number, if the record came from a file.
        line: Option<u64>,
        /// What was wrong.
        message: String,
    },

    /// Quarter label was not Q1..Q4.
    #[error("invalid quarter '{0}' (expected Q1, Q2, Q3 or Q4)")]
    InvalidQuarter(String),

    /// Summed registrations do not fit in a `u64`.
    #[error("registration total exceeds {max}", max = u64::MAX)]
    RegistrationOverflow,

    /// Configuration failed validation after loading.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // ========================================================================
    // WRAPPED ERRORS
    // ========================================================================
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// CSV read/write failed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for vahan-insights operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid-record error without a line number.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line: None,
            message: message.into(),
        }
    }

    /// True for errors caused by caller-supplied configuration (never retried).
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoDimensions
                | Self::UnknownDimension(_)
                | Self::DuplicateDimension(_)
                | Self::DimensionMismatch { .. }
                | Self::InvalidLag { .. }
                | Self::InvalidQuarter(_)
                | Self::ConfigValidation { .. }
        )
    }
}
