//! Memory model for the traced program
//!
//! This module provides the core runtime abstractions:
//! - [`value`]: Runtime value representation (scalars, shared containers, callables)
//! - [`stack`]: Call stack with immutable frames and a recursion bound
//! - [`heap`]: Object ids, container tracking and snapshot freezing
//!
//! # Object Identity
//!
//! Lists, dicts, sets and deques are reference types. Each one gets an id from
//! the trace's [`heap::IdAllocator`] at creation, and keeps it for its whole
//! lifetime. Ids are allocated sequentially, so they are identical across runs
//! of the same program.

pub mod heap;
pub mod stack;
pub mod value;
