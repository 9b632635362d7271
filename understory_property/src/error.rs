// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use std::rc::Rc;

use thiserror::Error;

/// A rejected value.
///
/// Returned by validation functions. Containers turn it into `valid = false`
/// when invalid values are allowed, or into [`PropertyError::Validation`] when
/// they are not.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a validation error with a human readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by property, host and binding operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// A write was rejected because the value is invalid and the container
    /// does not accept invalid values.
    #[error("invalid value for `{name}`: {source}")]
    Validation {
        /// Container name.
        name: Rc<str>,
        /// Why the value was rejected.
        source: ValidationError,
    },
    /// A write targeted a disabled property.
    #[error("property `{name}` is disabled")]
    Disabled {
        /// Property name.
        name: Rc<str>,
    },
    /// A listener with this name is already registered.
    #[error("a listener named `{name}` is already registered")]
    DuplicateListener {
        /// Listener name.
        name: Rc<str>,
    },
    /// A descriptor already labeled with one name was given another.
    #[error("descriptor is already bound as `{label}`, cannot bind it as `{requested}`")]
    DuplicateBinding {
        /// The existing `schema.name` label.
        label: String,
        /// The rejected `schema.name` label.
        requested: String,
    },
    /// A property with this name already exists.
    #[error("a property named `{name}` already exists")]
    DuplicateProperty {
        /// Property name.
        name: Rc<str>,
    },
    /// Two properties of different kinds cannot be bound.
    #[error("cannot bind a `{left}` property to a `{right}` property")]
    TypeMismatch {
        /// Kind of the first property.
        left: &'static str,
        /// Kind of the second property.
        right: &'static str,
    },
    /// No property with this name exists.
    #[error("no property named `{name}`")]
    UnknownProperty {
        /// Requested name.
        name: Rc<str>,
    },
    /// A value or key of the wrong type was supplied.
    #[error("property `{name}` expects a value of type `{expected}`")]
    WrongType {
        /// Property name.
        name: Rc<str>,
        /// The expected Rust type.
        expected: &'static str,
    },
    /// An index was out of range.
    #[error("index {index} out of range for length {len}")]
    Index {
        /// Requested index.
        index: usize,
        /// Current length.
        len: usize,
    },
    /// A structural precondition was violated.
    #[error("{0}")]
    Structure(String),
}

impl PropertyError {
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }

    pub(crate) fn check_index(index: usize, len: usize) -> Result<(), Self> {
        if index < len {
            Ok(())
        } else {
            Err(Self::Index { index, len })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_its_message() {
        let err = ValidationError::new("Must be at least 0");
        assert_eq!(err.to_string(), "Must be at least 0");
        assert_eq!(err.message(), "Must be at least 0");
    }

    #[test]
    fn property_error_messages_name_the_property() {
        let err = PropertyError::Validation {
            name: Rc::from("count"),
            source: ValidationError::new("Must be at most 10"),
        };
        assert_eq!(err.to_string(), "invalid value for `count`: Must be at most 10");

        let err = PropertyError::Disabled { name: Rc::from("count") };
        assert_eq!(err.to_string(), "property `count` is disabled");
    }

    #[test]
    fn validation_exposes_its_source() {
        use std::error::Error as _;
        let err = PropertyError::Validation {
            name: Rc::from("x"),
            source: ValidationError::new("nope"),
        };
        assert_eq!(err.source().map(ToString::to_string), Some("nope".into()));
    }

    #[test]
    fn index_check() {
        assert!(PropertyError::check_index(2, 3).is_ok());
        assert_eq!(
            PropertyError::check_index(3, 3),
            Err(PropertyError::Index { index: 3, len: 3 })
        );
    }
}
