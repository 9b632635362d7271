// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for binding containers and lists.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use understory_callqueue::CallQueue;
use understory_property::{BindFlags, PropertyValue, PropertyValueList};

fn scalar(name: &str, queue: &CallQueue) -> PropertyValue<i64> {
    PropertyValue::builder(name, 0).queue(queue.clone()).build()
}

fn list(name: &str, values: Vec<i64>, queue: &CallQueue) -> PropertyValueList<i64> {
    PropertyValueList::builder(name, values)
        .queue(queue.clone())
        .build()
}

fn count_scalar(prop: &PropertyValue<i64>) -> Rc<Cell<usize>> {
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

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

proptest! {
    #[test]
    fn bound_values_follow_either_side(writes in prop::collection::vec((any::<bool>(), -100_i64..100), 1..20)) {
        let queue = CallQueue::new(false);
        let a = scalar("a", &queue);
        let b = scalar("b", &queue);
        b.bind(&a, BindFlags::VALUE).unwrap();
        for (left, value) in writes {
            if left {
                a.set(value).unwrap();
            } else {
                b.set(value).unwrap();
            }
            prop_assert_eq!(a.get(), value);
            prop_assert_eq!(b.get(), value);
        }
    }

    #[test]
    fn bound_lists_match_the_master(
        master in prop::collection::vec(-50_i64..50, 0..8),
        slave in prop::collection::vec(-50_i64..50, 0..8),
    ) {
        let queue = CallQueue::new(false);
        let m = list("m", master.clone(), &queue);
        let s = list("s", slave, &queue);
        s.bind(&m, BindFlags::VALUE).unwrap();
        prop_assert_eq!(s.get(), master.clone());
        prop_assert_eq!(s.len(), m.len());
        for i in 0..m.len() {
            prop_assert_eq!(s.value_at(i), m.value_at(i));
        }
    }
}

#[test]
fn unbinding_stops_propagation_both_ways() {
    let queue = CallQueue::new(false);
    let a = scalar("a", &queue);
    let b = scalar("b", &queue);
    b.bind(&a, BindFlags::VALUE).unwrap();
    a.set(1).unwrap();
    assert_eq!(b.get(), 1);

    b.unbind(&a, BindFlags::VALUE);
    assert!(!a.is_bound(&b));
    a.set(2).unwrap();
    assert_eq!(b.get(), 1, "a no longer drives b");
    b.set(3).unwrap();
    assert_eq!(a.get(), 2, "b no longer drives a");
}

#[test]
fn a_cycle_notifies_each_container_once() {
    init_tracing();
    let queue = CallQueue::new(false);
    let a = scalar("a", &queue);
    let b = scalar("b", &queue);
    let c = scalar("c", &queue);
    b.bind(&a, BindFlags::VALUE).unwrap();
    c.bind(&b, BindFlags::VALUE).unwrap();
    a.bind(&c, BindFlags::VALUE).unwrap();

    let counts = [count_scalar(&a), count_scalar(&b), count_scalar(&c)];
    a.set(7).unwrap();

    assert_eq!([a.get(), b.get(), c.get()], [7, 7, 7]);
    for count in &counts {
        assert_eq!(count.get(), 1, "each container notifies exactly once");
    }
}

#[test]
fn listeners_see_every_bound_value_settled() {
    let queue = CallQueue::new(false);
    let a = scalar("a", &queue);
    let b = scalar("b", &queue);
    b.bind(&a, BindFlags::VALUE).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let other = b.clone();
    a.add_listener(
        "peek",
        move |change| {
            log.borrow_mut().push((change.value, other.get()));
            Ok(())
        },
        false,
    )
    .unwrap();

    a.set(4).unwrap();
    assert_eq!(*seen.borrow(), [(4, 4)]);
}

#[test]
fn equal_values_do_not_notify_on_bind() {
    let queue = CallQueue::new(false);
    let a = scalar("a", &queue);
    let b = scalar("b", &queue);
    let count = count_scalar(&b);
    b.bind(&a, BindFlags::VALUE).unwrap();
    assert_eq!(count.get(), 0, "both sides already held 0");
}

#[test]
fn dropping_a_partner_removes_the_edge() {
    let queue = CallQueue::new(false);
    let a = scalar("a", &queue);
    {
        let b = scalar("b", &queue);
        b.bind(&a, BindFlags::VALUE).unwrap();
        assert!(a.is_bound(&b));
    }
    a.set(9).unwrap();
    assert_eq!(a.get(), 9);
}

#[test]
fn list_structure_follows_the_master() {
    let queue = CallQueue::new(false);
    let m = list("m", vec![1, 2], &queue);
    let s = list("s", vec![], &queue);
    s.bind(&m, BindFlags::VALUE).unwrap();

    m.extend(vec![3, 4]).unwrap();
    assert_eq!(s.get(), [1, 2, 3, 4]);
    m.remove(0).unwrap();
    assert_eq!(s.get(), [2, 3, 4]);
    s.set_item(1, 30).unwrap();
    assert_eq!(m.get(), [2, 30, 4]);
    s.insert(0, 1).unwrap();
    assert_eq!(m.get(), [1, 2, 30, 4]);
}

#[test]
fn reordering_keeps_bound_items_alive() {
    init_tracing();
    let queue = CallQueue::new(false);
    let m = list("m", vec![1, 2, 3], &queue);
    let s = list("s", vec![], &queue);
    s.bind(&m, BindFlags::VALUE).unwrap();

    let first = s.item(0).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    first
        .add_listener(
            "log",
            move |change| {
                log.borrow_mut().push(change.value);
                Ok(())
            },
            false,
        )
        .unwrap();

    m.reorder(&[2, 0, 1]).unwrap();
    assert_eq!(s.get(), [3, 1, 2]);
    assert_eq!(s.position_of(&first), Some(1), "the same item moved");

    m.set_item(1, 10).unwrap();
    assert_eq!(first.get(), 10);
    assert_eq!(*seen.borrow(), [10]);
}

#[test]
fn unbinding_lists_unpairs_items() {
    init_tracing();
    let queue = CallQueue::new(false);
    let m = list("m", vec![1, 2], &queue);
    let s = list("s", vec![], &queue);
    s.bind(&m, BindFlags::all()).unwrap();
    let (mi, si) = (m.item(0).unwrap(), s.item(0).unwrap());
    assert!(mi.is_attribute_bound(&si));

    s.unbind(&m, BindFlags::all());
    assert!(!s.is_bound(&m));
    assert!(!mi.is_attribute_bound(&si));
    m.set_item(0, 5).unwrap();
    assert_eq!(s.get(), [1, 2]);
}

#[test]
fn a_list_cycle_keeps_items_and_converges() {
    init_tracing();
    let queue = CallQueue::new(false);
    let a = list("a", vec![1, 2], &queue);
    let b = list("b", vec![1, 2], &queue);
    let c = list("c", vec![1, 2], &queue);
    b.bind(&a, BindFlags::all()).unwrap();
    c.bind(&b, BindFlags::all()).unwrap();
    c.bind(&a, BindFlags::all()).unwrap();

    a.append(3).unwrap();
    let third = c.item(2).unwrap();
    b.set_item(2, 9).unwrap();
    for l in [&a, &b, &c] {
        assert_eq!(l.get(), [1, 2, 9]);
    }
    assert!(c.item(2).unwrap().ptr_eq(&third), "c keeps its third item");

    a.set_item(0, 7).unwrap();
    for l in [&a, &b, &c] {
        assert_eq!(l.get(), [7, 2, 9]);
    }

    c.remove(1).unwrap();
    for l in [&a, &b, &c] {
        assert_eq!(l.get(), [7, 9]);
    }
    a.set_item(1, 4).unwrap();
    assert_eq!(third.get(), 4, "the kept item still follows the cycle");
    assert_eq!(b.get(), [7, 4]);
}
