pub mod memory;
pub mod json_file;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{MemoryStorage, MemoryStore};
pub use json_file::JsonFileStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SQLiteStorage;
