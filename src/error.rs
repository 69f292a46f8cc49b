//! Error handling types for irodori
//!
//! Nothing in the validation engine is fatal. Provider failures leave spans
//! invalid and are reported to the host; the errors here cover the surfaces
//! around the engine (configuration, actor lifetime, tree-sitter setup).

use std::sync::PoisonError;
use thiserror::Error;

/// Crate-level error type
#[derive(Debug, Error)]
pub enum IrodoriError {
    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Query compilation failed
    #[error("Query error: {message}")]
    Query { message: String },

    /// The grammar could not be loaded into a parser
    #[error("Language not supported: {message}")]
    LanguageNotSupported { message: String },

    /// An offset or span does not fit the current document
    #[error("Span {start}..{end} is out of bounds for length {length}")]
    OutOfBounds {
        start: usize,
        end: usize,
        length: usize,
    },

    /// The styler task is no longer running
    #[error("Styler task has shut down")]
    EngineClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for irodori operations
pub type IrodoriResult<T> = Result<T, IrodoriError>;

impl IrodoriError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        IrodoriError::Config {
            message: message.into(),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        IrodoriError::Query {
            message: message.into(),
        }
    }

    /// Create a language error
    pub fn language_not_supported(message: impl Into<String>) -> Self {
        IrodoriError::LanguageNotSupported {
            message: message.into(),
        }
    }
}

/// Failure raised by a token provider while computing a span.
///
/// Distinct from `ComputationResult::Unavailable`: an error means the
/// provider tried and failed, so the span stays invalid until a later pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Parsing the content failed
    #[error("parse failed: {message}")]
    Parse { message: String },

    /// The computation was cancelled before producing a result
    #[error("computation cancelled")]
    Cancelled,

    /// Any other provider-specific failure
    #[error("{message}")]
    Failed { message: String },
}

impl ProviderError {
    pub fn parse(message: impl Into<String>) -> Self {
        ProviderError::Parse {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ProviderError::Failed {
            message: message.into(),
        }
    }
}

/// Helper trait to recover the guard from a poisoned std lock
pub trait LockResultExt<T> {
    /// Take the guard even if another thread panicked while holding the lock.
    ///
    /// The context parameter names the operation in the recovery log line.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "irodori::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn test_recover_poison_returns_inner_value() {
        let shared = Arc::new(Mutex::new(41));
        let clone = Arc::clone(&shared);

        let _ = thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(shared.is_poisoned());
        let mut guard = shared.lock().recover_poison("test");
        *guard += 1;
        assert_eq!(*guard, 42);
    }

    #[test]
    fn test_error_messages() {
        let err = IrodoriError::OutOfBounds {
            start: 3,
            end: 9,
            length: 5,
        };
        assert_eq!(err.to_string(), "Span 3..9 is out of bounds for length 5");
        assert_eq!(
            ProviderError::parse("no tree").to_string(),
            "parse failed: no tree"
        );
        assert_eq!(
            IrodoriError::config("bad").to_string(),
            "Invalid configuration: bad"
        );
    }
}
