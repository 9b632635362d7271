// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Colour`] kind and its [`ColourValue`] container.

use core::ops::Deref;
use std::rc::Rc;

use crate::any::AnyProperty;
use crate::attributes::Attributes;
use crate::container::ContainerParts;
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::kind::PropertyKind;
use crate::scalar::PropertyValue;

/// Opaque white.
pub const WHITE: [f64; 4] = [1.0; 4];

/// An RGBA colour with every channel in `0.0..=1.0`.
///
/// Written channels are clamped into range. The default is opaque white.
///
/// ```rust
/// use understory_property::{Colour, Descriptor, HasProperties, Schema};
///
/// let mut builder = Schema::builder("Brush");
/// let ink = builder
///     .register("ink", &Descriptor::from(Colour::new()))
///     .unwrap();
/// let brush = HasProperties::new(&builder.build());
/// brush.set(ink, [2.0, 0.5, -1.0, 0.25]).unwrap();
/// assert_eq!(brush.get(ink).unwrap(), [1.0, 0.5, 0.0, 0.25]);
///
/// brush.prop_val(ink).unwrap().set_rgb([0.0, 0.0, 1.0]).unwrap();
/// assert_eq!(brush.get(ink).unwrap(), [0.0, 0.0, 1.0, 0.25]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Colour {
    default: [f64; 4],
}

impl Default for Colour {
    fn default() -> Self {
        Self { default: WHITE }
    }
}

impl Colour {
    /// A colour defaulting to opaque white.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default colour.
    #[must_use]
    pub fn with_default(mut self, rgba: [f64; 4]) -> Self {
        self.default = clamp(rgba);
        self
    }

    /// Sets an opaque default colour.
    #[must_use]
    pub fn with_default_rgb(self, [r, g, b]: [f64; 3]) -> Self {
        self.with_default([r, g, b, 1.0])
    }
}

fn clamp(rgba: [f64; 4]) -> [f64; 4] {
    rgba.map(|c| c.clamp(0.0, 1.0))
}

impl PropertyKind for Colour {
    type Value = [f64; 4];
    type Container = ColourValue;

    fn kind_name(&self) -> &'static str {
        "Colour"
    }

    fn default_value(&self) -> [f64; 4] {
        self.default
    }

    fn cast(&self, _ctx: &Context, _attrs: &Attributes, value: [f64; 4]) -> [f64; 4] {
        clamp(value)
    }

    fn validate(
        &self,
        _ctx: &Context,
        _attrs: &Attributes,
        value: &[f64; 4],
    ) -> Result<(), ValidationError> {
        if value.iter().all(|c| (0.0..=1.0).contains(c)) {
            Ok(())
        } else {
            Err(ValidationError::new(
                "Colour values must be between 0.0 and 1.0",
            ))
        }
    }

    fn build(&self, parts: ContainerParts<[f64; 4]>) -> ColourValue {
        ColourValue {
            value: PropertyValue::from_parts(parts),
        }
    }

    fn erase(container: &ColourValue) -> Rc<dyn AnyProperty> {
        Rc::new(container.value.clone())
    }
}

/// The container of a [`Colour`] property.
///
/// Dereferences to the underlying [`PropertyValue`].
#[derive(Clone, Debug)]
pub struct ColourValue {
    value: PropertyValue<[f64; 4]>,
}

impl Deref for ColourValue {
    type Target = PropertyValue<[f64; 4]>;

    fn deref(&self) -> &PropertyValue<[f64; 4]> {
        &self.value
    }
}

impl ColourValue {
    /// Writes the colour channels and keeps the current alpha.
    pub fn set_rgb(&self, [r, g, b]: [f64; 3]) -> Result<(), PropertyError> {
        self.value.set([r, g, b, self.alpha()])
    }

    /// Writes the alpha channel and keeps the colour.
    pub fn set_alpha(&self, alpha: f64) -> Result<(), PropertyError> {
        let [r, g, b, _] = self.value.get();
        self.value.set([r, g, b, alpha])
    }

    /// The colour channels.
    #[must_use]
    pub fn rgb(&self) -> [f64; 3] {
        let [r, g, b, _] = self.value.get();
        [r, g, b]
    }

    /// The alpha channel.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.value.get()[3]
    }
}
