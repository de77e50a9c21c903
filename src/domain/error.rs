//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for cryptosim.
#[derive(Debug, thiserror::Error)]
pub enum CryptosimError {
    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("lookahead: training data contains {observed}, which is not before target date {target}")]
    Lookahead {
        observed: NaiveDate,
        target: NaiveDate,
    },

    #[error("model fit failed: {reason}")]
    ModelFit { reason: String },

    #[error("invalid bot transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CryptosimError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        CryptosimError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors that only abort the current bot cycle instead of the whole run.
    pub fn is_cycle_local(&self) -> bool {
        matches!(
            self,
            CryptosimError::InsufficientData { .. }
                | CryptosimError::InvalidParameter { .. }
                | CryptosimError::DataSource { .. }
        )
    }
}

impl From<&CryptosimError> for std::process::ExitCode {
    fn from(err: &CryptosimError) -> Self {
        let code: u8 = match err {
            CryptosimError::Io(_) => 1,
            CryptosimError::ConfigParse { .. }
            | CryptosimError::ConfigMissing { .. }
            | CryptosimError::ConfigInvalid { .. } => 2,
            CryptosimError::DataSource { .. } => 3,
            CryptosimError::InvalidParameter { .. }
            | CryptosimError::InvalidOrder { .. }
            | CryptosimError::InvalidTransition { .. } => 4,
            CryptosimError::InsufficientData { .. } => 5,
            CryptosimError::Lookahead { .. } | CryptosimError::ModelFit { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
