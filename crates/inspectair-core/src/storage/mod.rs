//! Rolling minute history and its persistence
//!
//! - [`HistoryEntry`]: 16-byte record of one averaged minute
//! - [`RollingHistoryStore`]: 24 hour ring of entries in RAM, newest hour backed up to flash
//! - [`KeyValueStore`]: the namespaced persistence capability the history writes through

pub mod entry;
pub mod history;
pub mod kv;

pub use entry::*;
pub use history::*;
pub use kv::*;
