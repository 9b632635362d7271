// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The FIFO call queue.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashSet;

use crate::error::CallResult;

/// De-duplication key: function identity plus a rendering of the arguments.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct CallKey {
    func: usize,
    args: String,
}

/// A pending invocation.
pub struct Call {
    description: String,
    key: Option<CallKey>,
    run: Box<dyn FnOnce() -> CallResult>,
}

impl Call {
    /// Creates a call that invokes `func(&args)`.
    ///
    /// The call carries a de-duplication key built from the address of
    /// `func` and the `Debug` rendering of `args`.
    pub fn new<A: fmt::Debug + 'static>(
        description: impl Into<String>,
        func: Rc<dyn Fn(&A) -> CallResult>,
        args: A,
    ) -> Self {
        let key = CallKey {
            func: Rc::as_ptr(&func).cast::<()>() as usize,
            args: format!("{args:?}"),
        };
        Self {
            description: description.into(),
            key: Some(key),
            run: Box::new(move || func(&args)),
        }
    }

    /// Creates a call from a one-shot closure.
    ///
    /// Such calls have no de-duplication key and are always enqueued.
    pub fn from_fn(
        description: impl Into<String>,
        run: impl FnOnce() -> CallResult + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            key: None,
            run: Box::new(run),
        }
    }

    /// Returns the description used when logging this call.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("description", &self.description)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct QueueInner {
    pending: RefCell<VecDeque<Call>>,
    queued: RefCell<HashSet<CallKey>>,
    skip_duplicates: bool,
    draining: Cell<bool>,
}

/// A shared FIFO of pending callback invocations.
///
/// Cloning a `CallQueue` yields another handle to the same queue.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use understory_callqueue::{Call, CallQueue};
///
/// let queue = CallQueue::new(false);
/// let order = Rc::new(std::cell::RefCell::new(Vec::new()));
///
/// let inner_queue = queue.clone();
/// let log = order.clone();
/// queue.push(Call::from_fn("outer", move || {
///     let log2 = log.clone();
///     // Only enqueued: it runs after "outer" returns.
///     inner_queue.push(Call::from_fn("inner", move || {
///         log2.borrow_mut().push("inner");
///         Ok(())
///     }));
///     log.borrow_mut().push("outer");
///     Ok(())
/// }));
///
/// assert_eq!(*order.borrow(), vec!["outer", "inner"]);
/// ```
#[derive(Clone, Default)]
pub struct CallQueue {
    inner: Rc<QueueInner>,
}

thread_local! {
    static GLOBAL: CallQueue = CallQueue::new(false);
}

impl CallQueue {
    /// Creates a new, empty queue.
    #[must_use]
    pub fn new(skip_duplicates: bool) -> Self {
        Self {
            inner: Rc::new(QueueInner {
                skip_duplicates,
                ..QueueInner::default()
            }),
        }
    }

    /// Returns a handle to this thread's default queue.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL.with(Clone::clone)
    }

    /// Returns `true` if this queue drops calls that are already pending.
    #[must_use]
    #[inline]
    pub fn skips_duplicates(&self) -> bool {
        self.inner.skip_duplicates
    }

    /// Returns `true` while the queue is invoking callbacks.
    #[must_use]
    #[inline]
    pub fn is_draining(&self) -> bool {
        self.inner.draining.get()
    }

    /// Returns the number of pending calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Returns `true` if no calls are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.pending.borrow().is_empty()
    }

    /// Returns `true` if both handles refer to the same queue.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Enqueues `func(&args)` and drains the queue unless it is already
    /// draining.
    ///
    /// Returns `false` if the call was dropped as a duplicate.
    pub fn call<A: fmt::Debug + 'static>(
        &self,
        description: impl Into<String>,
        func: Rc<dyn Fn(&A) -> CallResult>,
        args: A,
    ) -> bool {
        self.push(Call::new(description, func, args))
    }

    /// Enqueues a prepared [`Call`] and drains.
    ///
    /// Returns `false` if the call was dropped as a duplicate.
    pub fn push(&self, call: Call) -> bool {
        let queued = self.enqueue(call);
        if queued {
            self.drain();
        }
        queued
    }

    /// Enqueues every call in `calls`, then drains once.
    ///
    /// Nothing runs until the whole batch is queued. Returns `false` if every
    /// call was dropped as a duplicate (or the batch was empty).
    pub fn call_all(&self, calls: impl IntoIterator<Item = Call>) -> bool {
        let mut any = false;
        for call in calls {
            any |= self.enqueue(call);
        }
        if any {
            self.drain();
        }
        any
    }

    fn enqueue(&self, call: Call) -> bool {
        if self.inner.skip_duplicates {
            if let Some(key) = &call.key {
                if !self.inner.queued.borrow_mut().insert(key.clone()) {
                    tracing::debug!(description = %call.description, "skipping duplicate call");
                    return false;
                }
            }
        }
        self.inner.pending.borrow_mut().push_back(call);
        true
    }

    fn pop(&self) -> Option<Call> {
        let call = self.inner.pending.borrow_mut().pop_front()?;
        if self.inner.skip_duplicates {
            if let Some(key) = &call.key {
                self.inner.queued.borrow_mut().remove(key);
            }
        }
        Some(call)
    }

    fn drain(&self) {
        if self.inner.draining.replace(true) {
            return;
        }
        let _reset = DrainGuard(&self.inner.draining);
        while let Some(call) = self.pop() {
            let Call {
                description, run, ..
            } = call;
            tracing::trace!(description = %description, "invoking queued call");
            if let Err(err) = run() {
                tracing::warn!(description = %description, error = %err, "queued call failed");
            }
        }
    }
}

impl fmt::Debug for CallQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallQueue")
            .field("pending", &self.len())
            .field("skip_duplicates", &self.inner.skip_duplicates)
            .field("draining", &self.inner.draining.get())
            .finish()
    }
}

/// Clears the draining flag even if a callback panics.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallError;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, Rc<dyn Fn(&u32) -> CallResult>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let func: Rc<dyn Fn(&u32) -> CallResult> = {
            let seen = seen.clone();
            Rc::new(move |v: &u32| {
                seen.borrow_mut().push(*v);
                Ok(())
            })
        };
        (seen, func)
    }

    #[test]
    fn call_runs_immediately_when_idle() {
        let queue = CallQueue::new(false);
        let (seen, func) = recorder();
        assert!(queue.call("one", func, 7));
        assert_eq!(*seen.borrow(), vec![7]);
        assert!(queue.is_empty());
        assert!(!queue.is_draining());
    }

    #[test]
    fn skip_duplicates_drops_pending_copy() {
        let queue = CallQueue::new(true);
        let (seen, func) = recorder();

        // Hold the queue in a draining state so nothing runs until the
        // outer call returns.
        let q = queue.clone();
        let f = func.clone();
        queue.push(Call::from_fn("outer", move || {
            assert!(q.call("a", f.clone(), 1), "first copy must be queued");
            assert!(!q.call("b", f.clone(), 1), "second copy must be dropped");
            assert!(q.call("c", f, 2), "different args are distinct");
            Ok(())
        }));

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn duplicates_are_kept_without_skip_mode() {
        let queue = CallQueue::new(false);
        let (seen, func) = recorder();
        queue.call_all([
            Call::new("a", func.clone(), 3),
            Call::new("b", func, 3),
        ]);
        assert_eq!(*seen.borrow(), vec![3, 3]);
    }

    #[test]
    fn failing_call_does_not_stop_drain() {
        let queue = CallQueue::new(false);
        let (seen, func) = recorder();
        queue.call_all([
            Call::from_fn("boom", || Err(CallError::msg("boom"))),
            Call::new("after", func, 9),
        ]);
        assert_eq!(*seen.borrow(), vec![9]);
    }

    #[test]
    fn nested_calls_append_to_the_back() {
        let queue = CallQueue::new(false);
        let (seen, func) = recorder();
        let q = queue.clone();
        let f = func.clone();
        queue.call_all([
            Call::from_fn("spawner", move || {
                q.call("nested", f, 3);
                Ok(())
            }),
            Call::new("second", func.clone(), 2),
        ]);
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }

    #[test]
    fn key_is_released_when_popped() {
        let queue = CallQueue::new(true);
        let (seen, func) = recorder();
        assert!(queue.call("a", func.clone(), 5));
        assert!(queue.call("a", func, 5));
        assert_eq!(*seen.borrow(), vec![5, 5]);
    }

    #[test]
    fn global_queue_is_shared_per_thread() {
        assert!(CallQueue::global().ptr_eq(&CallQueue::global()));
    }
}
