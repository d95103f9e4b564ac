// rust/batch-reader/src/dataset/mod.rs

//! Sequential batch reading over fixed-record dataset files.
//!
//! A dataset is two or three parallel files that share one record order:
//! examples (with a shape header), identifiers, and for training sets,
//! labels. [`Reader`] reads the first two, [`LabeledReader`] all three; both
//! embed a [`RecordCursor`] and implement [`BatchSource`].
//!
//! # Example
//!
//! ```no_run
//! use batch_reader::dataset::{BatchSource, LabeledReader};
//!
//! let mut reader = LabeledReader::new("imgdata.dat", "nmdata.dat", "lbldata.dat", 64)?;
//! while !reader.is_finished() {
//!     let batch = reader.get_next_batch()?;
//!     assert_eq!(batch.label_count(), batch.len());
//!     // Hand batch.examples() and batch.labels() to the compute engine
//! }
//! # Ok::<(), batch_reader::ReaderError>(())
//! ```

mod batch;
mod cursor;
mod format;
mod labeled;
mod reader;
mod writer;

#[cfg(test)]
mod test_support;

pub use batch::{Batch, BatchParts};
pub use cursor::{ReaderState, RecordCursor};
pub use format::{ElementType, ExampleHeader, LabelHeader, RecordLayout, ID_RECORD_BYTES};
pub use labeled::LabeledReader;
pub use reader::{BatchSource, Reader};
pub use writer::DatasetWriter;
