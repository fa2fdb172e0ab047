//! Storage module for persistent data management.
//!
//! The loan ledger is written through a `StorageBackend`, chosen by the
//! operator's configuration.
//!
//! ## Backends
//!
//! - **InMemoryStore**: Fast, ephemeral storage for testing
//! - **FileStore**: JSON snapshot for development and inspection
//! - **BinaryStore**: Compact bincode snapshot
//!
//! ## Usage
//!
//! ```rust,ignore
//! use private_lending::storage::{FileStore, TypedStore};
//!
//! let store = TypedStore::new(FileStore::new("/path/to/data")?);
//! ```

pub mod backend;

pub use backend::*;
