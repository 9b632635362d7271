// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordering and de-duplication behavior of `CallQueue` as seen by callers.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use understory_callqueue::{Call, CallError, CallQueue, CallResult};

fn recorder() -> (Rc<RefCell<Vec<i32>>>, Rc<dyn Fn(&i32) -> CallResult>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let func: Rc<dyn Fn(&i32) -> CallResult> = Rc::new(move |v: &i32| {
        sink.borrow_mut().push(*v);
        Ok(())
    });
    (seen, func)
}

#[test]
fn reentrant_call_is_deferred_until_current_callback_returns() {
    let queue = CallQueue::new(false);
    let log = Rc::new(RefCell::new(Vec::new()));

    let q = queue.clone();
    let outer_log = log.clone();
    queue.push(Call::from_fn("outer", move || {
        let inner_log = outer_log.clone();
        q.push(Call::from_fn("inner", move || {
            inner_log.borrow_mut().push("inner");
            Ok(())
        }));
        // The nested push must not have run yet.
        outer_log.borrow_mut().push("outer-end");
        Ok(())
    }));

    assert_eq!(*log.borrow(), vec!["outer-end", "inner"]);
}

#[test]
fn errors_are_isolated_per_call() {
    let queue = CallQueue::new(false);
    let (seen, func) = recorder();
    let failing: Rc<dyn Fn(&i32) -> CallResult> =
        Rc::new(|v: &i32| Err(CallError::msg(format!("rejecting {v}"))));

    queue.call_all([
        Call::new("ok-1", func.clone(), 1),
        Call::new("bad", failing, 2),
        Call::new("ok-3", func, 3),
    ]);

    assert_eq!(*seen.borrow(), vec![1, 3]);
}

#[test]
fn same_function_same_args_queued_twice_runs_once() {
    let queue = CallQueue::new(true);
    let (seen, func) = recorder();
    let q = queue.clone();
    queue.push(Call::from_fn("hold", move || {
        q.call("first", func.clone(), 11);
        q.call("second", func, 11);
        Ok(())
    }));
    assert_eq!(*seen.borrow(), vec![11]);
}

proptest! {
    #[test]
    fn batch_runs_in_fifo_order(values in proptest::collection::vec(any::<i32>(), 0..32)) {
        let queue = CallQueue::new(false);
        let (seen, func) = recorder();
        queue.call_all(
            values
                .iter()
                .map(|v| Call::new("batch", func.clone(), *v))
                .collect::<Vec<_>>(),
        );
        prop_assert_eq!(&*seen.borrow(), &values);
        prop_assert!(queue.is_empty());
    }
}
