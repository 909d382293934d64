pub mod db;
pub mod encode;
pub mod migrations;

pub use db::{CacheStats, Database, RefreshPolicy, UpsertOutcome};
