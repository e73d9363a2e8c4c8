//! Local persistence of generation history and user preferences.
pub mod manager;
pub mod store;

pub use manager::{HistoryManager, Preferences, PreferencesUpdate, StorageUsage, Theme};
pub use store::{FileStore, KeyValueStore, MemoryStore};
