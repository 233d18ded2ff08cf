//! Core types and trait definitions for the UDISE admin dataset.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the wide [`AdminRecord`](record::AdminRecord), the column catalog that
//! describes its table, and the storage traits every backend implements.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod columns;
pub mod datetime;
pub mod error;
pub mod record;
pub mod store;
pub mod value;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use error::{Error, Result};
