// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for writing, validating and observing properties.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use understory_callqueue::CallQueue;
use understory_property::{
    Choice, Descriptor, HasProperties, HostOptions, Int, Object, PropertyError, PropertyValue,
    Schema, ValidationError,
};

fn counted(prop: &PropertyValue<i64>) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let hits = count.clone();
    prop.add_listener(
        "count",
        move |_| {
            hits.set(hits.get() + 1);
            Ok(())
        },
        false,
    )
    .unwrap();
    count
}

fn bounded(name: &str) -> PropertyValue<i64> {
    PropertyValue::builder(name, 0)
        .validate(|_, _, v: &i64| {
            if (-10..=10).contains(v) {
                Ok(())
            } else {
                Err(ValidationError::new("out of range"))
            }
        })
        .allow_invalid(false)
        .queue(CallQueue::new(false))
        .build()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

proptest! {
    #[test]
    fn valid_writes_read_back(v in -10_i64..=10) {
        let prop = bounded("p");
        prop_assert!(prop.set(v).is_ok());
        prop_assert_eq!(prop.get(), v);
        prop_assert!(prop.is_valid());
    }

    #[test]
    fn rejected_writes_leave_the_value_alone(before in -10_i64..=10, v in 11_i64..1000) {
        let prop = bounded("p");
        prop.set(before).unwrap();
        let count = counted(&prop);
        let err = prop.set(v).unwrap_err();
        prop_assert!(
            matches!(err, PropertyError::Validation { .. }),
            "expected a validation error"
        );
        prop_assert_eq!(prop.get(), before);
        prop_assert!(prop.is_valid());
        prop_assert_eq!(count.get(), 0);
    }

    #[test]
    fn repeated_writes_notify_once(v in 1_i64..=10, repeats in 1_usize..5) {
        let prop = bounded("p");
        let count = counted(&prop);
        for _ in 0..repeats {
            prop.set(v).unwrap();
        }
        prop_assert_eq!(count.get(), 1);
    }
}

#[test]
fn objects_notify_on_every_write() {
    let mut builder = Schema::builder("Holder");
    let payload = builder
        .register("payload", &Descriptor::from(Object::<Vec<u8>>::new()))
        .unwrap();
    let host = HasProperties::with_options(
        &builder.build(),
        HostOptions::new().queue(CallQueue::new(false)),
    );
    let count = Rc::new(Cell::new(0));
    let hits = count.clone();
    host.add_listener(
        "payload",
        "count",
        move |_| {
            hits.set(hits.get() + 1);
            Ok(())
        },
        false,
    )
    .unwrap();

    host.set(payload, vec![1, 2]).unwrap();
    host.set(payload, vec![1, 2]).unwrap();
    host.set(payload, vec![1, 2]).unwrap();
    assert_eq!(count.get(), 3, "every object write notifies");
}

#[test]
fn bounded_int_flags_or_rejects_out_of_range_values() {
    let mut builder = Schema::builder("Dial");
    let loose = builder
        .register("loose", &Descriptor::from(Int::new().min(0).max(10)))
        .unwrap();
    let strict = builder
        .register(
            "strict",
            &Descriptor::builder(Int::new().min(0).max(10))
                .allow_invalid(false)
                .build(),
        )
        .unwrap();
    let host = HasProperties::with_options(
        &builder.build(),
        HostOptions::new().queue(CallQueue::new(false)),
    );

    host.set(loose, -1).unwrap();
    assert_eq!(host.get(loose).unwrap(), -1);
    assert!(!host.is_valid("loose").unwrap());

    let before = host.get(strict).unwrap();
    assert_eq!(before, 5, "default is the middle of the range");
    let err = host.set(strict, -1).unwrap_err();
    assert!(matches!(err, PropertyError::Validation { .. }));
    assert_eq!(host.get(strict).unwrap(), before);
    assert!(host.is_valid("strict").unwrap());
}

#[test]
fn removing_the_selected_choice_notifies_once() {
    let mut builder = Schema::builder("Picker");
    let letter = builder
        .register(
            "letter",
            &Descriptor::from(Choice::new(["a".to_owned(), "b".to_owned()])),
        )
        .unwrap();
    let host = HasProperties::with_options(
        &builder.build(),
        HostOptions::new().queue(CallQueue::new(false)),
    );
    assert_eq!(host.get(letter).unwrap(), "a");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    host.add_listener(
        "letter",
        "log",
        move |change| {
            log.borrow_mut().push(change.value.get::<String>());
            Ok(())
        },
        false,
    )
    .unwrap();

    let choice = host.prop_val(letter).unwrap();
    choice.remove_choice(&"a".to_owned()).unwrap();

    assert_eq!(host.get(letter).unwrap(), "b");
    assert_eq!(choice.choices(), ["b".to_owned()]);
    assert_eq!(*seen.borrow(), [Some("b".to_owned())]);
}

#[test]
fn disabled_notification_still_writes() {
    let prop = bounded("p");
    let count = counted(&prop);
    prop.disable_notification();
    prop.set(4).unwrap();
    assert_eq!(prop.get(), 4);
    assert_eq!(count.get(), 0, "listeners stay quiet while disabled");
    prop.enable_notification();
    prop.set(5).unwrap();
    assert_eq!(count.get(), 1, "listeners resume once enabled");
}

#[test]
fn listener_errors_do_not_stop_other_listeners() {
    init_tracing();
    let prop = bounded("p");
    prop.add_listener(
        "broken",
        |_| Err(understory_callqueue::CallError::msg("boom")),
        false,
    )
    .unwrap();
    let count = counted(&prop);
    prop.set(3).unwrap();
    assert_eq!(count.get(), 1, "a failing listener is isolated");
}
