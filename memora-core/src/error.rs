//! Error types for memora.
//!
//! Every fallible operation in the core returns [`MemoResult<T>`]. Failures raised by a
//! wrapped computation are never converted into [`MemoError`]: they travel through the
//! computation's own error type, which only needs a `From<MemoError>` conversion so that
//! key-derivation failures can share the same channel.

use thiserror::Error;

/// Result type alias for memora operations
pub type MemoResult<T> = Result<T, MemoError>;

/// All errors produced by the memoization layer itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoError {
    /// Malformed capacity or an unsupported combination of options.
    ///
    /// Raised while building a decorator, never while calling a wrapped computation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The dispatch shape of a computation cannot be memoized.
    #[error("unsupported callable kind: {0}")]
    UnsupportedCallableKind(String),

    /// The default key generator could not derive a key from one argument.
    ///
    /// Only the offending call fails; the cache is left untouched.
    #[error("argument {argument} cannot be used as a cache key: {reason}")]
    UnhashableArgument { argument: String, reason: String },
}

impl MemoError {
    pub(crate) fn invalid_configuration(msg: impl Into<String>) -> Self {
        MemoError::InvalidConfiguration(msg.into())
    }

    pub(crate) fn unsupported_kind(msg: impl Into<String>) -> Self {
        MemoError::UnsupportedCallableKind(msg.into())
    }

    pub(crate) fn unhashable(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        MemoError::UnhashableArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that can only happen while configuring a decorator.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MemoError::InvalidConfiguration(_) | MemoError::UnsupportedCallableKind(_)
        )
    }
}
