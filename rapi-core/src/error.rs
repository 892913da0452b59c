//! Error taxonomy for the library.
//!
//! Every public entry point returns a [`RapiError`] on failure.  Each variant
//! maps to a wire-stable integer code that callers may persist, so the codes
//! must never change.

use thiserror::Error;

/// Success code reported over the wire.
pub const NO_ERROR: i32 = 0;
/// Code for [`RapiError::Generic`].
pub const GENERIC_ERROR: i32 = -1;
/// Code for [`RapiError::OpNotSupported`].
pub const OP_NOT_SUPPORTED_ERROR: i32 = -20;
/// Code for [`RapiError::Memory`].
pub const MEMORY_ERROR: i32 = -30;
/// Code for [`RapiError::Param`].
pub const PARAM_ERROR: i32 = -40;
/// Code for [`RapiError::Type`].
pub const TYPE_ERROR: i32 = -50;

/// Errors that can occur in the alignment interface.
#[derive(Debug, Error)]
pub enum RapiError {
    #[error("{0}")]
    Generic(String),

    #[error("operation not supported: {0}")]
    OpNotSupported(String),

    #[error("memory allocation failed: {0}")]
    Memory(String),

    #[error("invalid parameter: {0}")]
    Param(String),

    #[error("value type mismatch: {0}")]
    Type(String),
}

impl RapiError {
    /// The wire-stable integer code for this error.
    pub fn code(&self) -> i32 {
        match self {
            RapiError::Generic(_) => GENERIC_ERROR,
            RapiError::OpNotSupported(_) => OP_NOT_SUPPORTED_ERROR,
            RapiError::Memory(_) => MEMORY_ERROR,
            RapiError::Param(_) => PARAM_ERROR,
            RapiError::Type(_) => TYPE_ERROR,
        }
    }

    /// Stable name for the error category.
    pub fn name(&self) -> &'static str {
        match self {
            RapiError::Generic(_) => "GENERIC_ERROR",
            RapiError::OpNotSupported(_) => "OP_NOT_SUPPORTED_ERROR",
            RapiError::Memory(_) => "MEMORY_ERROR",
            RapiError::Param(_) => "PARAM_ERROR",
            RapiError::Type(_) => "TYPE_ERROR",
        }
    }
}

impl From<std::fmt::Error> for RapiError {
    fn from(_: std::fmt::Error) -> Self {
        RapiError::Generic("text formatting failed".to_string())
    }
}

pub type Result<T> = std::result::Result<T, RapiError>;
