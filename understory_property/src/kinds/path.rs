// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`FilePath`] kind.

use std::path::Path;
use std::rc::Rc;

use crate::any::AnyProperty;
use crate::attributes::Attributes;
use crate::container::ContainerParts;
use crate::error::ValidationError;
use crate::host::Context;
use crate::kind::PropertyKind;
use crate::scalar::PropertyValue;

/// Must-exist attribute of [`FilePath`], a `bool`.
pub const EXISTS: &str = "exists";
/// File-or-directory attribute of [`FilePath`], a `bool`.
pub const IS_FILE: &str = "is_file";
/// Accepted file suffixes of [`FilePath`], a `Vec<String>`.
pub const SUFFIXES: &str = "suffixes";

/// A `String` property naming a file or a directory.
///
/// Nothing is checked unless `exists` is set. Then the path must name an
/// existing file (ending in one of `suffixes`, if any are given) or, with
/// `is_file` unset, an existing directory. The empty path is always valid
/// and counts as missing for required descriptors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePath {
    exists: bool,
    is_file: bool,
    suffixes: Vec<String>,
}

impl Default for FilePath {
    fn default() -> Self {
        Self {
            exists: false,
            is_file: true,
            suffixes: Vec::new(),
        }
    }
}

impl FilePath {
    /// A path to a file that need not exist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the path to exist.
    #[must_use]
    pub fn exists(mut self, exists: bool) -> Self {
        self.exists = exists;
        self
    }

    /// Expects a directory instead of a file.
    #[must_use]
    pub fn directory(mut self) -> Self {
        self.is_file = false;
        self
    }

    /// Restricts files to the given suffixes.
    #[must_use]
    pub fn suffixes<S: Into<String>>(mut self, suffixes: impl IntoIterator<Item = S>) -> Self {
        self.suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }
}

impl PropertyKind for FilePath {
    type Value = String;
    type Container = PropertyValue<String>;

    fn kind_name(&self) -> &'static str {
        "FilePath"
    }

    fn default_value(&self) -> String {
        String::new()
    }

    fn constraints(&self) -> Attributes {
        Attributes::new()
            .with(EXISTS, self.exists)
            .with(IS_FILE, self.is_file)
            .with(SUFFIXES, self.suffixes.clone())
    }

    fn validate(
        &self,
        _ctx: &Context,
        attrs: &Attributes,
        value: &String,
    ) -> Result<(), ValidationError> {
        if value.is_empty() || attrs.value::<bool>(EXISTS) != Some(&true) {
            return Ok(());
        }
        let path = Path::new(value);
        if attrs.value::<bool>(IS_FILE) == Some(&false) {
            if !path.is_dir() {
                return Err(ValidationError::new(format!(
                    "Must be a directory ({value})"
                )));
            }
            return Ok(());
        }
        if !path.is_file() {
            return Err(ValidationError::new(format!("Must be a file ({value})")));
        }
        let suffixes = attrs
            .value::<Vec<String>>(SUFFIXES)
            .map_or(&[][..], Vec::as_slice);
        if suffixes.is_empty() || suffixes.iter().any(|s| value.ends_with(s.as_str())) {
            return Ok(());
        }
        Err(ValidationError::new(format!(
            "Must be a file ending in [{}] ({value})",
            suffixes.join(",")
        )))
    }

    fn is_missing(&self, value: &String) -> bool {
        value.is_empty()
    }

    fn build(&self, parts: ContainerParts<String>) -> PropertyValue<String> {
        PropertyValue::from_parts(parts)
    }

    fn erase(container: &PropertyValue<String>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}
