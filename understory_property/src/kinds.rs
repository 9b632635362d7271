// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The built-in property kinds.

pub mod basic;
pub mod choice;
pub mod colour;
pub mod geometry;
pub mod list;
pub mod number;
pub mod path;
