// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned [`Bounds`] and [`Point`]s in one to four dimensions.
//!
//! Both are lists of clamped [`Real`] items. Per-axis limits are the
//! `minval`/`maxval` attributes of the items, so a limit change revalidates
//! only the items it touches.

use core::ops::Deref;
use std::rc::Rc;

use crate::any::AnyProperty;
use crate::attributes::{optional, Attributes};
use crate::container::ContainerParts;
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::kind::PropertyKind;
use crate::kinds::basic::{MAXLEN, MINLEN};
use crate::kinds::list::{check_length, item_template};
use crate::kinds::number::{Real, MAXVAL, MINVAL};
use crate::list::PropertyValueList;
use crate::scalar::PropertyValue;

/// Minimum `hi - lo` distance attribute of [`Bounds`], an `f64`.
pub const MIN_DISTANCE: &str = "min_distance";

const MAX_DIMS: usize = 4;

fn check_dims(ndims: usize) {
    assert!(
        (1..=MAX_DIMS).contains(&ndims),
        "only one to four dimensions are supported, got {ndims}"
    );
}

fn item_kind() -> Real {
    Real::new().clamped(true)
}

fn axis_item(list: &PropertyValueList<f64>, index: usize) -> Result<PropertyValue<f64>, PropertyError> {
    list.item(index).ok_or(PropertyError::Index {
        index,
        len: list.len(),
    })
}

fn item_limit(list: &PropertyValueList<f64>, index: usize, key: &str) -> Option<f64> {
    list.item(index)
        .and_then(|item| optional::<f64>(&item.attributes(), key))
}

/// `ndims` pairs of `(lo, hi)` values.
///
/// The value is laid out as `[lo0, hi0, lo1, hi1, ...]`. Validation requires
/// `lo <= hi` and `hi - lo >= min_distance` on every axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    ndims: usize,
    min_distance: f64,
}

impl Bounds {
    /// Bounds in `ndims` dimensions.
    ///
    /// # Panics
    ///
    /// Panics unless `ndims` is between 1 and 4.
    #[must_use]
    pub fn new(ndims: usize) -> Self {
        check_dims(ndims);
        Self {
            ndims,
            min_distance: 0.0,
        }
    }

    /// Sets the minimum distance between `lo` and `hi`.
    #[must_use]
    pub fn min_distance(mut self, distance: f64) -> Self {
        self.min_distance = distance;
        self
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.ndims
    }
}

impl PropertyKind for Bounds {
    type Value = Vec<f64>;
    type Container = BoundsValue;

    fn kind_name(&self) -> &'static str {
        "Bounds"
    }

    fn default_value(&self) -> Vec<f64> {
        [0.0, self.min_distance].repeat(self.ndims)
    }

    fn constraints(&self) -> Attributes {
        Attributes::new()
            .with(MINLEN, Some(2 * self.ndims))
            .with(MAXLEN, Some(2 * self.ndims))
            .with(MIN_DISTANCE, self.min_distance)
    }

    fn validate(
        &self,
        _ctx: &Context,
        attrs: &Attributes,
        value: &Vec<f64>,
    ) -> Result<(), ValidationError> {
        check_length(attrs, value.len())?;
        let min_distance = attrs.value::<f64>(MIN_DISTANCE).copied().unwrap_or(0.0);
        for (axis, pair) in value.chunks_exact(2).enumerate() {
            let (lo, hi) = (pair[0], pair[1]);
            if lo > hi {
                return Err(ValidationError::new(format!(
                    "Minimum bound must be smaller than maximum bound (dimension {axis}, {lo} - {hi})"
                )));
            }
            if hi - lo < min_distance {
                return Err(ValidationError::new(format!(
                    "Minimum and maximum bounds must be at least {min_distance} apart"
                )));
            }
        }
        Ok(())
    }

    fn equals(&self, a: &Vec<f64>, b: &Vec<f64>) -> bool {
        let real = item_kind();
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| real.equals(x, y))
    }

    fn build(&self, parts: ContainerParts<Vec<f64>>) -> BoundsValue {
        BoundsValue {
            list: PropertyValueList::from_parts(parts, item_template(&item_kind())),
            ndims: self.ndims,
        }
    }

    fn erase(container: &BoundsValue) -> Rc<dyn AnyProperty> {
        Rc::new(container.list.clone())
    }
}

/// The container of a [`Bounds`] property.
///
/// Dereferences to the underlying [`PropertyValueList`]; the methods here
/// address its items by axis.
#[derive(Clone, Debug)]
pub struct BoundsValue {
    list: PropertyValueList<f64>,
    ndims: usize,
}

impl Deref for BoundsValue {
    type Target = PropertyValueList<f64>;

    fn deref(&self) -> &PropertyValueList<f64> {
        &self.list
    }
}

impl BoundsValue {
    /// Number of dimensions.
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// Low value of `axis`.
    #[must_use]
    pub fn lo(&self, axis: usize) -> Option<f64> {
        self.list.value_at(axis * 2)
    }

    /// High value of `axis`.
    #[must_use]
    pub fn hi(&self, axis: usize) -> Option<f64> {
        self.list.value_at(axis * 2 + 1)
    }

    /// Low values of every axis.
    #[must_use]
    pub fn los(&self) -> Vec<f64> {
        self.list.get().into_iter().step_by(2).collect()
    }

    /// High values of every axis.
    #[must_use]
    pub fn his(&self) -> Vec<f64> {
        self.list.get().into_iter().skip(1).step_by(2).collect()
    }

    /// `(lo, hi)` of `axis`.
    #[must_use]
    pub fn range(&self, axis: usize) -> Option<(f64, f64)> {
        Some((self.lo(axis)?, self.hi(axis)?))
    }

    /// Distance between `lo` and `hi` on `axis`.
    #[must_use]
    pub fn len_of(&self, axis: usize) -> Option<f64> {
        self.range(axis).map(|(lo, hi)| (hi - lo).abs())
    }

    /// Sets the low value of `axis`.
    pub fn set_lo(&self, axis: usize, value: f64) -> Result<(), PropertyError> {
        self.list.set_item(axis * 2, value)
    }

    /// Sets the high value of `axis`.
    pub fn set_hi(&self, axis: usize, value: f64) -> Result<(), PropertyError> {
        self.list.set_item(axis * 2 + 1, value)
    }

    /// Sets both values of `axis` with a single list notification.
    pub fn set_range(&self, axis: usize, lo: f64, hi: f64) -> Result<(), PropertyError> {
        let start = axis * 2;
        PropertyError::check_index(start + 1, self.list.len())?;
        self.list.set_slice(start..start + 2, vec![lo, hi])
    }

    /// Lowest value `lo` may take on `axis`.
    #[must_use]
    pub fn min(&self, axis: usize) -> Option<f64> {
        item_limit(&self.list, axis * 2, MINVAL)
    }

    /// Highest value `hi` may take on `axis`.
    #[must_use]
    pub fn max(&self, axis: usize) -> Option<f64> {
        item_limit(&self.list, axis * 2 + 1, MAXVAL)
    }

    /// `(min, max)` of `axis`.
    #[must_use]
    pub fn limits(&self, axis: usize) -> (Option<f64>, Option<f64>) {
        (self.min(axis), self.max(axis))
    }

    fn set_axis_limit(&self, axis: usize, key: &str, value: Option<f64>) -> Result<(), PropertyError> {
        let lo = axis_item(&self.list, axis * 2)?;
        let hi = axis_item(&self.list, axis * 2 + 1)?;
        lo.set_attribute(key, value);
        hi.set_attribute(key, value);
        Ok(())
    }

    /// Sets the lower limit of both values of `axis`.
    pub fn set_min(&self, axis: usize, min: Option<f64>) -> Result<(), PropertyError> {
        self.set_axis_limit(axis, MINVAL, min)
    }

    /// Sets the upper limit of both values of `axis`.
    pub fn set_max(&self, axis: usize, max: Option<f64>) -> Result<(), PropertyError> {
        self.set_axis_limit(axis, MAXVAL, max)
    }

    /// Sets both limits of `axis`.
    pub fn set_limits(
        &self,
        axis: usize,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), PropertyError> {
        self.set_min(axis, min)?;
        self.set_max(axis, max)
    }

    /// Whether `point` lies inside the bounds, edges included.
    ///
    /// `point` must have one coordinate per dimension.
    pub fn in_bounds(&self, point: &[f64]) -> Result<bool, PropertyError> {
        let value = self.list.get();
        if point.len() * 2 != value.len() {
            return Err(PropertyError::structure(format!(
                "invalid number of dimensions: {point:?}"
            )));
        }
        Ok(point
            .iter()
            .zip(value.chunks_exact(2))
            .all(|(coord, pair)| *coord >= pair[0] && *coord <= pair[1]))
    }

    /// `(lo, hi)` of the first axis.
    #[must_use]
    pub fn x(&self) -> Option<(f64, f64)> {
        self.range(0)
    }

    /// `(lo, hi)` of the second axis.
    #[must_use]
    pub fn y(&self) -> Option<(f64, f64)> {
        self.range(1)
    }

    /// `(lo, hi)` of the third axis.
    #[must_use]
    pub fn z(&self) -> Option<(f64, f64)> {
        self.range(2)
    }

    /// `(lo, hi)` of the fourth axis.
    #[must_use]
    pub fn t(&self) -> Option<(f64, f64)> {
        self.range(3)
    }
}

/// A position in `ndims` dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    ndims: usize,
}

impl Point {
    /// A point in `ndims` dimensions.
    ///
    /// # Panics
    ///
    /// Panics unless `ndims` is between 1 and 4.
    #[must_use]
    pub fn new(ndims: usize) -> Self {
        check_dims(ndims);
        Self { ndims }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.ndims
    }
}

impl PropertyKind for Point {
    type Value = Vec<f64>;
    type Container = PointValue;

    fn kind_name(&self) -> &'static str {
        "Point"
    }

    fn default_value(&self) -> Vec<f64> {
        vec![0.0; self.ndims]
    }

    fn constraints(&self) -> Attributes {
        Attributes::new()
            .with(MINLEN, Some(self.ndims))
            .with(MAXLEN, Some(self.ndims))
    }

    fn validate(
        &self,
        _ctx: &Context,
        attrs: &Attributes,
        value: &Vec<f64>,
    ) -> Result<(), ValidationError> {
        check_length(attrs, value.len())
    }

    fn equals(&self, a: &Vec<f64>, b: &Vec<f64>) -> bool {
        let real = item_kind();
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| real.equals(x, y))
    }

    fn build(&self, parts: ContainerParts<Vec<f64>>) -> PointValue {
        PointValue {
            list: PropertyValueList::from_parts(parts, item_template(&item_kind())),
            ndims: self.ndims,
        }
    }

    fn erase(container: &PointValue) -> Rc<dyn AnyProperty> {
        Rc::new(container.list.clone())
    }
}

/// The container of a [`Point`] property.
#[derive(Clone, Debug)]
pub struct PointValue {
    list: PropertyValueList<f64>,
    ndims: usize,
}

impl Deref for PointValue {
    type Target = PropertyValueList<f64>;

    fn deref(&self) -> &PropertyValueList<f64> {
        &self.list
    }
}

impl PointValue {
    /// Number of dimensions.
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// Coordinate on `axis`.
    #[must_use]
    pub fn pos(&self, axis: usize) -> Option<f64> {
        self.list.value_at(axis)
    }

    /// Sets the coordinate on `axis`.
    pub fn set_pos(&self, axis: usize, value: f64) -> Result<(), PropertyError> {
        self.list.set_item(axis, value)
    }

    /// Lower limit on `axis`.
    #[must_use]
    pub fn min(&self, axis: usize) -> Option<f64> {
        item_limit(&self.list, axis, MINVAL)
    }

    /// Upper limit on `axis`.
    #[must_use]
    pub fn max(&self, axis: usize) -> Option<f64> {
        item_limit(&self.list, axis, MAXVAL)
    }

    /// `(min, max)` on `axis`.
    #[must_use]
    pub fn limits(&self, axis: usize) -> (Option<f64>, Option<f64>) {
        (self.min(axis), self.max(axis))
    }

    /// Sets the lower limit on `axis`.
    pub fn set_min(&self, axis: usize, min: Option<f64>) -> Result<(), PropertyError> {
        axis_item(&self.list, axis)?.set_attribute(MINVAL, min);
        Ok(())
    }

    /// Sets the upper limit on `axis`.
    pub fn set_max(&self, axis: usize, max: Option<f64>) -> Result<(), PropertyError> {
        axis_item(&self.list, axis)?.set_attribute(MAXVAL, max);
        Ok(())
    }

    /// Sets both limits on `axis`.
    pub fn set_limits(
        &self,
        axis: usize,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), PropertyError> {
        self.set_min(axis, min)?;
        self.set_max(axis, max)
    }

    /// First coordinate.
    #[must_use]
    pub fn x(&self) -> Option<f64> {
        self.pos(0)
    }

    /// Second coordinate.
    #[must_use]
    pub fn y(&self) -> Option<f64> {
        self.pos(1)
    }

    /// Third coordinate.
    #[must_use]
    pub fn z(&self) -> Option<f64> {
        self.pos(2)
    }

    /// Fourth coordinate.
    #[must_use]
    pub fn t(&self) -> Option<f64> {
        self.pos(3)
    }
}
