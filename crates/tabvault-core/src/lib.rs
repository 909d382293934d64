//! Core domain model for tabvault.
//!
//! This crate defines the song/tab-version model, the value object handed
//! to the UI, the SQLite cache schema, and the idempotent upsert contract
//! the resolution pipeline writes through.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
