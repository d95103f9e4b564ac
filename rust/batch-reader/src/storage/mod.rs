// rust/batch-reader/src/storage/mod.rs

//! Storage abstraction for dataset streams.
//!
//! This module provides the traits every reader opens its streams through,
//! plus the local filesystem implementation. Each `open_read` hands back an
//! exclusively owned stream; dropping it releases the file handle (or the
//! memory map) immediately.
//!
//! # Example
//!
//! ```no_run
//! use batch_reader::config::StorageConfig;
//! use batch_reader::storage::{LocalStorage, StorageBackend};
//! use std::io::{Read, Write};
//! use std::path::Path;
//!
//! let storage = LocalStorage::new(&StorageConfig::default());
//!
//! let mut writer = storage.open_write(Path::new("ids.dat")).unwrap();
//! writer.write_all(&7i32.to_le_bytes()).unwrap();
//! writer.finish().unwrap();
//!
//! let mut reader = storage.open_read(Path::new("ids.dat")).unwrap();
//! let mut record = [0u8; 4];
//! reader.read_exact(&mut record).unwrap();
//! ```

mod local;
mod traits;

pub use local::LocalStorage;
pub use traits::{StorageBackend, StorageReader, StorageWriter};
