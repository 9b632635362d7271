// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors returned by queued callbacks.

use std::error::Error;

use thiserror::Error;

/// Result type returned by queued callbacks.
pub type CallResult = Result<(), CallError>;

/// An error reported by a queued callback.
///
/// The queue never propagates these; they are logged and draining continues.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CallError(Box<dyn Error + Send + Sync + 'static>);

impl CallError {
    /// Creates an error from a plain message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    /// Wraps an arbitrary error.
    #[must_use]
    pub fn new(source: impl Error + Send + Sync + 'static) -> Self {
        Self(Box::new(source))
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn Error + Send + Sync + 'static> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trips_through_display() {
        let err = CallError::msg("listener exploded");
        assert_eq!(err.to_string(), "listener exploded");
    }

    #[test]
    fn wraps_foreign_errors() {
        let parse = "x".parse::<i32>().unwrap_err();
        let expected = parse.to_string();
        let err = CallError::new(parse);
        assert_eq!(err.to_string(), expected);
        assert!(err.into_inner().is::<core::num::ParseIntError>());
    }
}
