//! Custom error types for the feature-extraction engine.
//!
//! This module defines the primary error type, `SfeError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures the engine can
//! produce, from recipe parsing problems to buffer-arena allocation.
//!
//! Every error carries enough context to be printed as a single line; the
//! CLI prints `category()` next to the message so scripted callers can
//! dispatch on it, while library callers match on the variants directly.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type SfeResult<T> = std::result::Result<T, SfeError>;

#[derive(Error, Debug)]
pub enum SfeError {
    #[error("syntax error in \"{text}\" at position {position}")]
    Syntax { text: String, position: usize },

    #[error("transform {class} does not support parameter \"{name}\"")]
    UnknownParameter { class: String, name: String },

    #[error("\"{value}\" is an invalid value for parameter \"{name}\" of transform {class}")]
    InvalidValue {
        class: String,
        name: String,
        value: String,
    },

    #[error("transform \"{0}\" is not registered")]
    TransformNotRegistered(String),

    #[error("no format converter from \"{from}\" to \"{to}\" is registered")]
    IncompatibleFormat { from: String, to: String },

    #[error("feature \"{0}\" has already been added")]
    DuplicateFeatureName(String),

    #[error("feature \"{new}\" ends on the node already terminating \"{existing}\"")]
    ChainCollision { existing: String, new: String },

    #[error("the transform tree is already prepared for execution")]
    TreeIsFrozen,

    #[error("the transform tree is not prepared for execution")]
    TreeNotFrozen,

    #[error("the transform tree has no features")]
    EmptyTree,

    #[error("input waveform is invalid: {0}")]
    InvalidInput(String),

    #[error("transform {class} produced invalid output: {message}")]
    InvalidOutput { class: String, message: String },

    #[error("failed to allocate {bytes} bytes for the buffer arena")]
    AllocationFailed { bytes: usize },

    #[error("sampling rate {0} Hz is out of the supported range")]
    InvalidSamplingRate(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SfeError {
    /// Stable category name, one per taxonomy entry.
    pub fn category(&self) -> &'static str {
        match self {
            SfeError::Syntax { .. } => "SyntaxError",
            SfeError::UnknownParameter { .. } => "UnknownParameter",
            SfeError::InvalidValue { .. } => "InvalidValue",
            SfeError::TransformNotRegistered(_) => "TransformNotRegistered",
            SfeError::IncompatibleFormat { .. } => "IncompatibleFormat",
            SfeError::DuplicateFeatureName(_) => "DuplicateFeatureName",
            SfeError::ChainCollision { .. } => "ChainCollision",
            SfeError::TreeIsFrozen => "TreeIsFrozen",
            SfeError::TreeNotFrozen => "TreeNotFrozen",
            SfeError::EmptyTree => "EmptyTree",
            SfeError::InvalidInput(_) => "InvalidInput",
            SfeError::InvalidOutput { .. } => "InvalidOutput",
            SfeError::AllocationFailed { .. } => "AllocationFailed",
            SfeError::InvalidSamplingRate(_) => "InvalidValue",
            SfeError::Io(_) => "IoError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_stable() {
        let err = SfeError::InvalidValue {
            class: "FilterBank".into(),
            name: "number".into(),
            value: "-1".into(),
        };
        assert_eq!(err.category(), "InvalidValue");
        assert!(err.to_string().contains("FilterBank"));
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn chain_collision_mentions_both_features() {
        let err = SfeError::ChainCollision {
            existing: "MFCC".into(),
            new: "MFCC_COPY".into(),
        };
        let text = err.to_string();
        assert!(text.contains("MFCC"));
        assert!(text.contains("MFCC_COPY"));
    }
}
