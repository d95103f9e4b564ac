// rust/batch-reader/src/storage/traits.rs

//! Storage abstraction traits for dataset streams.
//!
//! Readers never touch the filesystem directly; every example, identifier
//! and label stream is obtained through a [`StorageBackend`], so tests and
//! alternative backends can substitute their own implementation.

use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::error::Result;

/// A handle for reading from storage.
///
/// Dataset streams are consumed front to back with `read_exact`; `Seek` is
/// used to rewind a stream when a batch read fails halfway through.
pub trait StorageReader: Read + Seek + Send {
    /// Returns the total size of the object in bytes.
    fn size(&self) -> u64;
}

/// A handle for writing to storage.
///
/// This trait extends `Write` with a method to finalize the write operation.
pub trait StorageWriter: Write + Send {
    /// Finishes the write operation, ensuring all data is persisted.
    ///
    /// This method must be called to complete the write. After calling
    /// `finish`, the writer should not be used again.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing the data fails.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// The core storage backend trait.
///
/// # Object Safety
///
/// This trait is object-safe and can be used with `Arc<dyn StorageBackend>`.
pub trait StorageBackend: Send + Sync {
    /// Opens an object for reading.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Path`](crate::ReaderError::Path) if the object
    /// doesn't exist or cannot be opened.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;

    /// Opens an object for writing.
    ///
    /// If the object already exists, it will be overwritten.
    /// Parent directories will be created if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be created or opened.
    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>>;
}
