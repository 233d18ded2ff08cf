//! Incremental, watermark-based copy of the `admin` table from one store
//! into another.
//!
//! A [`SyncJob`] reads every source row newer than the target's latest
//! `Timestamp`, aligns it with the column catalog and appends it to the
//! target: first as one set-based append, then row by row if that fails.

pub mod coerce;
pub mod config;
pub mod error;
pub mod job;


pub use coerce::{CoercionMode, CoercionStats};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use job::{LEASE_NAME, SyncJob, SyncMode, SyncOptions, SyncReport, watermark_floor};
