// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numeric kinds: [`Int`], [`Real`] and [`Percentage`].
//!
//! Limits live in the `minval` and `maxval` attributes as `Option<i64>` (for
//! `Int`) or `Option<f64>` (for `Real`), and `clamped` is a `bool`. Changing
//! them on a live container revalidates the current value.

use std::fmt;
use std::rc::Rc;

use crate::any::AnyProperty;
use crate::attributes::{optional, Attributes};
use crate::container::ContainerParts;
use crate::error::ValidationError;
use crate::host::Context;
use crate::kind::PropertyKind;
use crate::scalar::PropertyValue;
use crate::value::Value;

/// Lower limit attribute.
pub const MINVAL: &str = "minval";
/// Upper limit attribute.
pub const MAXVAL: &str = "maxval";
/// Clamp-instead-of-reject attribute.
pub const CLAMPED: &str = "clamped";

trait Number: Value + Copy + PartialOrd + fmt::Display {
    const ZERO: Self;
    fn mid(a: Self, b: Self) -> Self;
}

impl Number for i64 {
    const ZERO: Self = 0;
    fn mid(a: Self, b: Self) -> Self {
        a.midpoint(b)
    }
}

impl Number for f64 {
    const ZERO: Self = 0.0;
    fn mid(a: Self, b: Self) -> Self {
        a.midpoint(b)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Limits<N> {
    min: Option<N>,
    max: Option<N>,
    clamped: bool,
}

impl<N: Number> Limits<N> {
    fn constraints(&self) -> Attributes {
        Attributes::new()
            .with(MINVAL, self.min)
            .with(MAXVAL, self.max)
            .with(CLAMPED, self.clamped)
    }

    fn default_value(&self) -> N {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => N::mid(lo, hi),
            (Some(bound), None) | (None, Some(bound)) => bound,
            (None, None) => N::ZERO,
        }
    }
}

fn cast<N: Number>(attrs: &Attributes, value: N) -> N {
    if attrs.value::<bool>(CLAMPED) != Some(&true) {
        return value;
    }
    match (optional::<N>(attrs, MINVAL), optional::<N>(attrs, MAXVAL)) {
        (Some(lo), _) if value < lo => lo,
        (_, Some(hi)) if value > hi => hi,
        _ => value,
    }
}

fn validate<N: Number>(attrs: &Attributes, value: N) -> Result<(), ValidationError> {
    if let Some(lo) = optional::<N>(attrs, MINVAL) {
        if value < lo {
            return Err(ValidationError::new(format!("Must be at least {lo}")));
        }
    }
    if let Some(hi) = optional::<N>(attrs, MAXVAL) {
        if value > hi {
            return Err(ValidationError::new(format!("Must be at most {hi}")));
        }
    }
    Ok(())
}

/// An integer property.
///
/// The default value is the midpoint of the limits if both are set, the one
/// limit if only one is set, and `0` otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Int {
    limits: Limits<i64>,
}

impl Int {
    /// An unbounded integer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lower limit.
    #[must_use]
    pub fn min(mut self, min: i64) -> Self {
        self.limits.min = Some(min);
        self
    }

    /// Sets the upper limit.
    #[must_use]
    pub fn max(mut self, max: i64) -> Self {
        self.limits.max = Some(max);
        self
    }

    /// Clamps out-of-range values to the limits instead of rejecting them.
    #[must_use]
    pub fn clamped(mut self, clamped: bool) -> Self {
        self.limits.clamped = clamped;
        self
    }
}

impl PropertyKind for Int {
    type Value = i64;
    type Container = PropertyValue<i64>;

    fn kind_name(&self) -> &'static str {
        "Int"
    }

    fn default_value(&self) -> i64 {
        self.limits.default_value()
    }

    fn constraints(&self) -> Attributes {
        self.limits.constraints()
    }

    fn cast(&self, _ctx: &Context, attrs: &Attributes, value: i64) -> i64 {
        cast(attrs, value)
    }

    fn validate(&self, _ctx: &Context, attrs: &Attributes, value: &i64) -> Result<(), ValidationError> {
        validate(attrs, *value)
    }

    fn build(&self, parts: ContainerParts<i64>) -> PropertyValue<i64> {
        PropertyValue::from_parts(parts)
    }

    fn erase(container: &PropertyValue<i64>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}

/// Default equality tolerance of [`Real`].
pub const DEFAULT_PRECISION: f64 = 1e-9;

/// A floating point property.
///
/// Two values closer than the precision (`1e-9` unless changed) are equal, so
/// writing them does not notify.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Real {
    limits: Limits<f64>,
    precision: Option<f64>,
}

impl Default for Real {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            precision: Some(DEFAULT_PRECISION),
        }
    }
}

impl Real {
    /// An unbounded real.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lower limit.
    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.limits.min = Some(min);
        self
    }

    /// Sets the upper limit.
    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        self.limits.max = Some(max);
        self
    }

    /// Clamps out-of-range values to the limits instead of rejecting them.
    #[must_use]
    pub fn clamped(mut self, clamped: bool) -> Self {
        self.limits.clamped = clamped;
        self
    }

    /// Sets the equality tolerance; `None` compares exactly.
    #[must_use]
    pub fn precision(mut self, precision: Option<f64>) -> Self {
        self.precision = precision;
        self
    }
}

impl PropertyKind for Real {
    type Value = f64;
    type Container = PropertyValue<f64>;

    fn kind_name(&self) -> &'static str {
        "Real"
    }

    fn default_value(&self) -> f64 {
        self.limits.default_value()
    }

    fn constraints(&self) -> Attributes {
        self.limits.constraints()
    }

    fn cast(&self, _ctx: &Context, attrs: &Attributes, value: f64) -> f64 {
        cast(attrs, value)
    }

    fn validate(&self, _ctx: &Context, attrs: &Attributes, value: &f64) -> Result<(), ValidationError> {
        validate(attrs, *value)
    }

    fn equals(&self, a: &f64, b: &f64) -> bool {
        match self.precision {
            Some(precision) => (a - b).abs() < precision,
            None => a == b,
        }
    }

    fn build(&self, parts: ContainerParts<f64>) -> PropertyValue<f64> {
        PropertyValue::from_parts(parts)
    }

    fn erase(container: &PropertyValue<f64>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}

/// A [`Real`] between `0` and `100`, defaulting to `50`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Percentage {
    real: Real,
}

impl Default for Percentage {
    fn default() -> Self {
        Self {
            real: Real::new().min(0.0).max(100.0),
        }
    }
}

impl Percentage {
    /// A percentage with the standard limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamps out-of-range values to the limits instead of rejecting them.
    #[must_use]
    pub fn clamped(mut self, clamped: bool) -> Self {
        self.real = self.real.clamped(clamped);
        self
    }
}

impl PropertyKind for Percentage {
    type Value = f64;
    type Container = PropertyValue<f64>;

    fn kind_name(&self) -> &'static str {
        "Percentage"
    }

    fn default_value(&self) -> f64 {
        self.real.default_value()
    }

    fn constraints(&self) -> Attributes {
        self.real.constraints()
    }

    fn cast(&self, ctx: &Context, attrs: &Attributes, value: f64) -> f64 {
        self.real.cast(ctx, attrs, value)
    }

    fn validate(&self, ctx: &Context, attrs: &Attributes, value: &f64) -> Result<(), ValidationError> {
        self.real.validate(ctx, attrs, value)
    }

    fn equals(&self, a: &f64, b: &f64) -> bool {
        self.real.equals(a, b)
    }

    fn build(&self, parts: ContainerParts<f64>) -> PropertyValue<f64> {
        PropertyValue::from_parts(parts)
    }

    fn erase(container: &PropertyValue<f64>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_limits() {
        assert_eq!(Int::new().default_value(), 0);
        assert_eq!(Int::new().min(4).default_value(), 4);
        assert_eq!(Int::new().max(-2).default_value(), -2);
        assert_eq!(Int::new().min(0).max(10).default_value(), 5);
        assert_eq!(Percentage::new().default_value(), 50.0);
    }

    #[test]
    fn validation_messages_name_the_limit() {
        let attrs = Int::new().min(0).max(10).constraints();
        assert_eq!(
            validate(&attrs, -1_i64).unwrap_err().message(),
            "Must be at least 0"
        );
        assert_eq!(
            validate(&attrs, 11_i64).unwrap_err().message(),
            "Must be at most 10"
        );
        assert!(validate(&attrs, 10_i64).is_ok());
    }

    #[test]
    fn clamping_only_when_enabled() {
        let attrs = Real::new().min(0.0).max(1.0).constraints();
        assert_eq!(cast(&attrs, 2.0), 2.0);
        let attrs = Real::new().min(0.0).max(1.0).clamped(true).constraints();
        assert_eq!(cast(&attrs, 2.0), 1.0);
        assert_eq!(cast(&attrs, -2.0), 0.0);
    }

    #[test]
    fn real_equality_uses_precision() {
        let real = Real::new();
        assert!(real.equals(&1.0, &(1.0 + 1e-12)));
        assert!(!real.equals(&1.0, &1.1));
        let exact = Real::new().precision(None);
        assert!(!exact.equals(&1.0, &(1.0 + 1e-12)));
    }

    #[test]
    fn limits_can_change_on_a_live_container() {
        let value = crate::Descriptor::from(Int::new().min(0)).instantiate(
            "n".into(),
            Context::default(),
            understory_callqueue::CallQueue::new(false),
        );
        let typed = value
            .typed
            .downcast_ref::<PropertyValue<i64>>()
            .unwrap()
            .clone();
        assert!(typed.is_valid());
        typed.set_attribute(MINVAL, Some(5_i64));
        assert!(!typed.is_valid());
        assert_eq!(
            typed.validation_error().unwrap().message(),
            "Must be at least 5"
        );
        typed.set_attribute(MINVAL, None::<i64>);
        assert!(typed.is_valid());
    }
}
