// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Call Queue: serialized, re-entrancy safe callback dispatch.
//!
//! Property listeners frequently write to other properties, which in turn
//! notify their own listeners. Invoking those callbacks recursively makes the
//! order of observations hard to reason about and can blow the stack on
//! feedback loops. A [`CallQueue`] flattens this into a single FIFO: the
//! outermost [`CallQueue::call`] drains the queue until it is empty, while
//! calls made from inside a running callback only enqueue.
//!
//! ## Core Concepts
//!
//! - [`Call`]: one pending invocation, carrying a description for logging, the boxed
//!   function, and (for calls built with [`Call::new`]) a de-duplication key
//!   made of the function's identity and a `Debug` rendering of its arguments.
//! - [`CallQueue`]: a cheap, clonable handle to a shared queue. All
//!   containers that should observe each other's ordering share one handle;
//!   [`CallQueue::global`] returns the per-thread default.
//! - [`CallError`]: the error a callback may return. Errors are logged with
//!   `tracing` and never stop the drain.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_callqueue::{Call, CallQueue, CallResult};
//!
//! let queue = CallQueue::new(false);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let record: Rc<dyn Fn(&u32) -> CallResult> = {
//!     let seen = seen.clone();
//!     Rc::new(move |v: &u32| {
//!         seen.borrow_mut().push(*v);
//!         Ok(())
//!     })
//! };
//!
//! queue.call_all([
//!     Call::new("first", record.clone(), 1),
//!     Call::new("second", record, 2),
//! ]);
//! assert_eq!(*seen.borrow(), vec![1, 2]);
//! ```
//!
//! ## De-duplication
//!
//! A queue created with `skip_duplicates = true` drops a call whose
//! `(function, arguments)` key is already pending. The key is removed as soon
//! as the call is popped, so the same call may be queued again while it runs.
//! Argument rendering goes through `Debug`, which makes the key approximate:
//! two distinct values with the same rendering are treated as duplicates.

mod error;
mod queue;

pub use error::{CallError, CallResult};
pub use queue::{Call, CallQueue};
