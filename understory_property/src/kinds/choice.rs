// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Choice`] kind and its [`ChoiceValue`] container.
//!
//! The choice set is stored in four parallel attributes:
//!
//! - `choices`: `Vec<T>`
//! - `labels`: `Vec<String>`
//! - `alternates`: `Vec<Vec<T>>`, values accepted in place of each choice
//! - `choice_enabled`: `Vec<bool>`
//!
//! Editing the set on a live container goes through [`ChoiceValue`], which
//! keeps the four attributes consistent and reassigns the value when its
//! choice disappears.

use core::fmt;
use core::ops::Deref;
use std::rc::Rc;

use crate::any::AnyProperty;
use crate::attributes::Attributes;
use crate::container::ContainerParts;
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::kind::{PropertyKind, DEFAULT};
use crate::scalar::PropertyValue;
use crate::value::Value;

/// The choices attribute.
pub const CHOICES: &str = "choices";
/// The labels attribute.
pub const LABELS: &str = "labels";
/// The alternates attribute.
pub const ALTERNATES: &str = "alternates";
/// The per-choice enabled flags attribute.
pub const CHOICE_ENABLED: &str = "choice_enabled";

/// Values a [`Choice`] can hold.
pub trait ChoiceItem: Value + fmt::Display + Default {}

impl<T: Value + fmt::Display + Default> ChoiceItem for T {}

#[derive(Clone, Debug, PartialEq)]
struct ChoiceSet<T> {
    choices: Vec<T>,
    labels: Vec<String>,
    alternates: Vec<Vec<T>>,
    enabled: Vec<bool>,
}

impl<T: ChoiceItem> ChoiceSet<T> {
    fn new(choices: Vec<T>) -> Self {
        Self {
            labels: choices.iter().map(ToString::to_string).collect(),
            alternates: vec![Vec::new(); choices.len()],
            enabled: vec![true; choices.len()],
            choices,
        }
    }

    fn read(attrs: &Attributes) -> Self {
        let choices: Vec<T> = attrs.value::<Vec<T>>(CHOICES).cloned().unwrap_or_default();
        let n = choices.len();
        let mut set = Self::new(choices);
        if let Some(labels) = attrs.value::<Vec<String>>(LABELS).filter(|l| l.len() == n) {
            set.labels = labels.clone();
        }
        if let Some(alts) = attrs.value::<Vec<Vec<T>>>(ALTERNATES).filter(|a| a.len() == n) {
            set.alternates = alts.clone();
        }
        if let Some(enabled) = attrs.value::<Vec<bool>>(CHOICE_ENABLED).filter(|e| e.len() == n) {
            set.enabled = enabled.clone();
        }
        set
    }

    fn check(&self) -> Result<(), PropertyError> {
        let n = self.choices.len();
        if self.labels.len() != n || self.alternates.len() != n {
            return Err(PropertyError::structure(
                "labels and alternates are required for every choice",
            ));
        }
        let mut seen: Vec<&T> = Vec::new();
        for (choice, alts) in self.choices.iter().zip(&self.alternates) {
            for alt in alts {
                if seen.contains(&alt) {
                    return Err(PropertyError::structure(format!(
                        "duplicate alternate value (choice: {choice}): {alt}"
                    )));
                }
                seen.push(alt);
            }
        }
        Ok(())
    }

    fn index_of(&self, choice: &T) -> Option<usize> {
        self.choices.iter().position(|c| c == choice)
    }

    fn resolve(&self, value: &T) -> Option<usize> {
        self.index_of(value).or_else(|| {
            self.alternates
                .iter()
                .position(|alts| alts.contains(value))
        })
    }

    fn attributes(&self) -> Attributes {
        Attributes::new()
            .with(CHOICES, self.choices.clone())
            .with(LABELS, self.labels.clone())
            .with(ALTERNATES, self.alternates.clone())
            .with(CHOICE_ENABLED, self.enabled.clone())
    }
}

/// A value picked from a set of choices.
///
/// Invalid values are rejected by default. The default value is the first
/// choice.
///
/// ```rust
/// use understory_property::{Choice, Descriptor, HasProperties, Schema};
///
/// let mut builder = Schema::builder("Shape");
/// let kind = builder
///     .register("kind", &Descriptor::from(Choice::new(["circle", "square"])))
///     .unwrap();
/// let shape = HasProperties::new(&builder.build());
/// assert_eq!(shape.get(kind).unwrap(), "circle");
/// assert!(shape.set(kind, "triangle").is_err());
///
/// let kind = shape.prop_val(kind).unwrap();
/// kind.add_choice("triangle", None, Vec::new()).unwrap();
/// assert_eq!(kind.choices(), ["circle", "square", "triangle"]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Choice<T> {
    set: ChoiceSet<T>,
}

impl<T: ChoiceItem> Choice<T> {
    /// Choices labelled by their `Display` output.
    #[must_use]
    pub fn new(choices: impl IntoIterator<Item = T>) -> Self {
        Self {
            set: ChoiceSet::new(choices.into_iter().collect()),
        }
    }

    /// Replaces the labels, one per choice.
    pub fn with_labels(
        mut self,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, PropertyError> {
        self.set.labels = labels.into_iter().map(Into::into).collect();
        self.set.check()?;
        Ok(self)
    }

    /// Sets the alternate values of each choice.
    ///
    /// An alternate may belong to one choice only.
    pub fn with_alternates(mut self, alternates: Vec<Vec<T>>) -> Result<Self, PropertyError> {
        self.set.alternates = alternates;
        self.set.check()?;
        Ok(self)
    }
}

impl<T: ChoiceItem> PropertyKind for Choice<T> {
    type Value = T;
    type Container = ChoiceValue<T>;

    fn kind_name(&self) -> &'static str {
        "Choice"
    }

    fn default_value(&self) -> T {
        self.set.choices.first().cloned().unwrap_or_default()
    }

    fn constraints(&self) -> Attributes {
        self.set.attributes()
    }

    fn allow_invalid(&self) -> bool {
        false
    }

    fn cast(&self, _ctx: &Context, attrs: &Attributes, value: T) -> T {
        let set = ChoiceSet::<T>::read(attrs);
        if set.index_of(&value).is_some() {
            return value;
        }
        match set.resolve(&value) {
            Some(idx) => set.choices[idx].clone(),
            None => value,
        }
    }

    fn validate(&self, _ctx: &Context, attrs: &Attributes, value: &T) -> Result<(), ValidationError> {
        let set = ChoiceSet::<T>::read(attrs);
        if set.choices.is_empty() {
            return Ok(());
        }
        match set.resolve(value) {
            None => Err(ValidationError::new(format!("Invalid choice ({value})"))),
            Some(idx) if !set.enabled[idx] => Err(ValidationError::new(format!(
                "Choice is disabled ({value})"
            ))),
            Some(_) => Ok(()),
        }
    }

    fn build(&self, parts: ContainerParts<T>) -> ChoiceValue<T> {
        ChoiceValue {
            value: PropertyValue::from_parts(parts),
        }
    }

    fn erase(container: &ChoiceValue<T>) -> Rc<dyn AnyProperty> {
        Rc::new(container.value.clone())
    }
}

/// The container of a [`Choice`] property.
///
/// Dereferences to the underlying [`PropertyValue`].
#[derive(Clone, Debug)]
pub struct ChoiceValue<T: Value> {
    value: PropertyValue<T>,
}

impl<T: Value> Deref for ChoiceValue<T> {
    type Target = PropertyValue<T>;

    fn deref(&self) -> &PropertyValue<T> {
        &self.value
    }
}

impl<T: ChoiceItem> ChoiceValue<T> {
    fn choice_set(&self) -> ChoiceSet<T> {
        ChoiceSet::read(&self.value.attributes())
    }

    fn position(&self, set: &ChoiceSet<T>, choice: &T) -> Result<usize, PropertyError> {
        set.index_of(choice).ok_or_else(|| {
            PropertyError::structure(format!("{}: unknown choice {choice}", self.value.name()))
        })
    }

    /// The current choices.
    #[must_use]
    pub fn choices(&self) -> Vec<T> {
        self.choice_set().choices
    }

    /// The label of each choice.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.choice_set().labels
    }

    /// The alternates of each choice.
    #[must_use]
    pub fn alternates(&self) -> Vec<Vec<T>> {
        self.choice_set().alternates
    }

    /// Whether `choice` is enabled, or `None` if it is not a choice.
    #[must_use]
    pub fn choice_enabled(&self, choice: &T) -> Option<bool> {
        let set = self.choice_set();
        set.index_of(choice).map(|idx| set.enabled[idx])
    }

    /// Makes `choice` selectable again.
    pub fn enable_choice(&self, choice: &T) -> Result<(), PropertyError> {
        self.set_choice_enabled(choice, true)
    }

    /// Makes `choice` invalid without removing it.
    pub fn disable_choice(&self, choice: &T) -> Result<(), PropertyError> {
        self.set_choice_enabled(choice, false)
    }

    fn set_choice_enabled(&self, choice: &T, enabled: bool) -> Result<(), PropertyError> {
        let mut set = self.choice_set();
        let idx = self.position(&set, choice)?;
        set.enabled[idx] = enabled;
        self.value.set_attribute(CHOICE_ENABLED, set.enabled);
        Ok(())
    }

    /// Appends a choice. The label defaults to the choice's `Display` output.
    pub fn add_choice(
        &self,
        choice: T,
        label: Option<String>,
        alternates: Vec<T>,
    ) -> Result<(), PropertyError> {
        let mut set = self.choice_set();
        set.labels.push(label.unwrap_or_else(|| choice.to_string()));
        set.choices.push(choice);
        set.alternates.push(alternates);
        set.enabled.push(true);
        self.update(set)
    }

    /// Removes a choice, reassigning the value if it was selected.
    pub fn remove_choice(&self, choice: &T) -> Result<(), PropertyError> {
        let mut set = self.choice_set();
        let idx = self.position(&set, choice)?;
        set.choices.remove(idx);
        set.labels.remove(idx);
        set.alternates.remove(idx);
        set.enabled.remove(idx);
        self.update(set)
    }

    /// Replaces a choice's value, label or alternates in place.
    pub fn update_choice(
        &self,
        choice: &T,
        new_choice: Option<T>,
        new_label: Option<String>,
        new_alternates: Option<Vec<T>>,
    ) -> Result<(), PropertyError> {
        let mut set = self.choice_set();
        let idx = self.position(&set, choice)?;
        if let Some(new_choice) = new_choice {
            set.choices[idx] = new_choice;
        }
        if let Some(label) = new_label {
            set.labels[idx] = label;
        }
        if let Some(alternates) = new_alternates {
            set.alternates[idx] = alternates;
        }
        self.update(set)
    }

    /// Replaces the whole choice set.
    ///
    /// Labels default to the `Display` output of each choice and alternates
    /// to none. Enabled flags are kept for choices that survive.
    pub fn set_choices(
        &self,
        choices: Vec<T>,
        labels: Option<Vec<String>>,
        alternates: Option<Vec<Vec<T>>>,
    ) -> Result<(), PropertyError> {
        let old = self.choice_set();
        let mut set = ChoiceSet::new(choices);
        if let Some(labels) = labels {
            set.labels = labels;
        }
        if let Some(alternates) = alternates {
            set.alternates = alternates;
        }
        for (choice, enabled) in set.choices.iter().zip(&mut set.enabled) {
            if let Some(idx) = old.index_of(choice) {
                *enabled = old.enabled[idx];
            }
        }
        self.update(set)
    }

    /// Stores a new choice set and keeps the value on a live choice.
    ///
    /// Runs with notification off, then sends the attribute changes and at
    /// most one value notification.
    fn update(&self, set: ChoiceSet<T>) -> Result<(), PropertyError> {
        set.check()?;
        let value = &self.value;
        let old_value = value.get();
        let old_valid = value.is_valid();
        let old_attributes = value.attributes();
        let notify = value.notification_enabled();
        let allow = value.allows_invalid();
        value.disable_notification();
        value.set_allow_invalid(true);

        let default = value
            .attribute_as::<T>(DEFAULT)
            .filter(|d| set.index_of(d).is_some())
            .or_else(|| set.choices.first().cloned());
        let attributes = set.attributes();
        value.set_attributes(&attributes);
        if let Some(default) = &default {
            value.set_attribute(DEFAULT, default.clone());
        }
        if set.index_of(&old_value).is_none() {
            if let Some(default) = default {
                value.set_unchecked(default);
            }
        }

        value.set_notification_enabled(notify);
        value.set_allow_invalid(allow);
        if notify {
            let new_attributes = value.attributes();
            for key in attributes.keys().chain([DEFAULT]) {
                if old_attributes.get(key) != new_attributes.get(key) {
                    value.notify_attribute(key);
                }
            }
            if value.get() != old_value || value.is_valid() != old_valid {
                value.notify();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Descriptor;
    use std::cell::{Cell, RefCell};
    use understory_callqueue::CallQueue;

    fn choice_value(kind: Choice<&'static str>) -> ChoiceValue<&'static str> {
        let instance =
            Descriptor::from(kind).instantiate("c".into(), Context::default(), CallQueue::new(false));
        instance
            .typed
            .downcast_ref::<ChoiceValue<&'static str>>()
            .unwrap()
            .clone()
    }

    fn counter(value: &ChoiceValue<&'static str>) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        value
            .add_listener(
                "count",
                move |_| {
                    c.set(c.get() + 1);
                    Ok(())
                },
                false,
            )
            .unwrap();
        count
    }

    #[test]
    fn duplicate_alternates_are_rejected() {
        let err = Choice::new(["a", "b"])
            .with_alternates(vec![vec!["x"], vec!["x"]])
            .unwrap_err();
        assert!(matches!(err, PropertyError::Structure(_)));
        assert!(Choice::new(["a"]).with_labels(["A", "B"]).is_err());
    }

    #[test]
    fn alternates_are_cast_to_their_choice() {
        let value = choice_value(
            Choice::new(["yes", "no"])
                .with_alternates(vec![vec!["y"], vec!["n"]])
                .unwrap(),
        );
        value.set("n").unwrap();
        assert_eq!(value.get(), "no");
        let err = value.set("maybe").unwrap_err();
        assert!(matches!(err, PropertyError::Validation { .. }));
        assert_eq!(value.get(), "no");
    }

    #[test]
    fn disabled_choices_are_invalid() {
        let value = choice_value(Choice::new(["a", "b"]));
        value.disable_choice(&"b").unwrap();
        assert_eq!(value.choice_enabled(&"b"), Some(false));
        let err = value.set("b").unwrap_err();
        match err {
            PropertyError::Validation { source, .. } => {
                assert_eq!(source.message(), "Choice is disabled (b)");
            }
            other => panic!("unexpected {other:?}"),
        }
        value.disable_choice(&"a").unwrap();
        assert!(!value.is_valid());
        value.enable_choice(&"a").unwrap();
        assert!(value.is_valid());
        assert!(value.enable_choice(&"z").is_err());
    }

    #[test]
    fn removing_the_selected_choice_notifies_once() {
        let value = choice_value(Choice::new(["a", "b"]));
        let count = counter(&value);
        value.remove_choice(&"a").unwrap();
        assert_eq!(value.get(), "b");
        assert_eq!(value.choices(), ["b"]);
        assert_eq!(count.get(), 1);
        assert!(value.is_valid());
    }

    #[test]
    fn unrelated_edits_keep_the_value_quiet() {
        let value = choice_value(Choice::new(["a", "b"]));
        let count = counter(&value);
        value.add_choice("c", Some("Cee".into()), vec!["see"]).unwrap();
        value.update_choice(&"b", None, Some("Bee".into()), None).unwrap();
        assert_eq!(value.labels(), ["a", "Bee", "Cee"]);
        assert_eq!(value.alternates(), [vec![], vec![], vec!["see"]]);
        assert_eq!(value.get(), "a");
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn relabelling_announces_only_the_labels() {
        let value = choice_value(Choice::new(["a", "b"]));
        let keys = Rc::new(RefCell::new(Vec::new()));
        let k = keys.clone();
        value
            .add_attribute_listener(
                "keys",
                move |change| {
                    k.borrow_mut().push(change.key.to_string());
                    Ok(())
                },
                false,
            )
            .unwrap();
        value.update_choice(&"b", None, Some("Bee".into()), None).unwrap();
        assert_eq!(*keys.borrow(), [LABELS]);
        keys.borrow_mut().clear();
        value.update_choice(&"b", None, Some("Bee".into()), None).unwrap();
        assert!(keys.borrow().is_empty(), "an edit that changes nothing stays quiet");
    }

    #[test]
    fn set_choices_keeps_surviving_flags() {
        let value = choice_value(Choice::new(["a", "b", "c"]));
        value.disable_choice(&"c").unwrap();
        value.set_choices(vec!["c", "d"], None, None).unwrap();
        assert_eq!(value.choice_enabled(&"c"), Some(false));
        assert_eq!(value.choice_enabled(&"d"), Some(true));
        // "a" is gone and "c" is disabled, so the first choice is taken even
        // though it is not selectable.
        assert_eq!(value.get(), "c");
        assert!(!value.is_valid());
        assert_eq!(value.attribute_as::<&str>(DEFAULT), Some("c"));
    }
}
