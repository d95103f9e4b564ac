// rust/batch-reader/src/lib.rs

//! Fixed-record Batch Reader
//!
//! This crate streams fixed-size example records, their identifiers and
//! (optionally) their labels from parallel binary files in batches, for
//! feeding a training or inference loop. It includes error handling,
//! configuration, a storage abstraction, the readers themselves and a writer
//! for producing compatible dataset files.

pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{DatasetConfig, ReaderConfig, StorageConfig};
pub use dataset::{
    Batch, BatchParts, BatchSource, DatasetWriter, ElementType, ExampleHeader, LabelHeader,
    LabeledReader, Reader, ReaderState, RecordCursor, RecordLayout,
};
pub use error::{ReaderError, Result};
pub use loader::Loader;
pub use storage::{LocalStorage, StorageBackend, StorageReader, StorageWriter};
