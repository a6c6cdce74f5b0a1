//! Shared foundation for Zobot: configuration, the top-level error type,
//! and the append-only JSON journals.

pub mod config;
pub mod error;
pub mod journal;

pub use config::ZobotConfig;
pub use error::{Result, ZobotError};
pub use journal::{JournalRecord, JsonJournal};
