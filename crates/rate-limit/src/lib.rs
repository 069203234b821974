//! Rate limiting functionality for Pantry.
//!
//! This crate provides per-client, per-route rate limiting with support for:
//! - Fixed-window counters partitioned by client address and route
//! - Two-phase admission: a slot is reserved before the upstream call and
//!   committed or released once the outcome is known
//! - Conditional quota deduction: only qualifying outcomes consume quota
//!
//! Currently supports in-memory storage. A shared store for multi-instance
//! deployments would plug in behind the same storage trait.

#![deny(missing_docs)]

mod error;
mod manager;
mod storage;

pub use error::RateLimitError;
pub use manager::{RateLimitManager, Reservation};
pub use storage::{InMemoryStorage, RateLimitResult, RateLimitStorage, StorageError};
