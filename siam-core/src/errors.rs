use thiserror::Error;

/// Error type for invalid operations.
///
/// Every failure is raised synchronously to the caller; nothing in this
/// workspace retries or degrades internally.
#[derive(Error, Debug)]
pub enum SiamError {
    /// An enum-like configuration value is outside its accepted set.
    #[error("unsupported value '{value}' for {parameter}: accepted values are {accepted:?}")]
    UnsupportedOption {
        parameter: String,
        value: String,
        accepted: Vec<String>,
    },
    /// A configuration source failed to parse or validate.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// A scalar parameter is outside its valid domain.
    #[error("invalid value for parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },
    /// A time axis could not be constructed.
    #[error("invalid time axis: {0}")]
    InvalidTimeAxis(String),
    /// An input series is not defined on the expected year axis.
    #[error("time axis of '{name}' does not match the model horizon: expected {expected}, got {found}")]
    TimeAxisMismatch {
        name: String,
        expected: String,
        found: String,
    },
    /// A computation left the numerical domain it is defined on.
    #[error("numerical domain violation in {context}: {message}")]
    NumericalDomain { context: String, message: String },
    /// A gradient accessor was invoked before a forward pass stored its
    /// intermediates.
    #[error("gradient of '{component}' requested before a forward computation")]
    GradientBeforeCompute { component: String },
}

/// Convenience type for `Result<T, SiamError>`.
pub type SiamResult<T> = Result<T, SiamError>;
