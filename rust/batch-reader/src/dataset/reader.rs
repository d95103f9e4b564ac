// rust/batch-reader/src/dataset/reader.rs

use std::iter::FusedIterator;
use std::path::Path;

use crate::config::{DatasetConfig, StorageConfig};
use crate::error::Result;
use crate::storage::{LocalStorage, StorageBackend};

use super::batch::Batch;
use super::cursor::{ReaderState, RecordCursor};
use super::format::ExampleHeader;

/// Common interface of the unlabeled and labeled readers.
///
/// A training loop polls [`is_finished`](Self::is_finished) and calls
/// [`get_next_batch`](Self::get_next_batch) until the dataset is exhausted.
/// All accessors are answered by the embedded [`RecordCursor`].
pub trait BatchSource: Send {
    /// The shared cursor over the example and identifier streams.
    fn cursor(&self) -> &RecordCursor;

    /// Reads the next batch of `min(batch_size, ex_left())` examples.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::Usage`](crate::ReaderError::Usage) if the reader is
    ///   already exhausted; no stream is touched and the cursor is unchanged.
    /// - [`ReaderError::Io`](crate::ReaderError::Io) if any stream ends
    ///   before the batch is complete. No partial batch is returned and the
    ///   cursor is unchanged.
    fn get_next_batch(&mut self) -> Result<Batch>;

    fn is_finished(&self) -> bool {
        self.cursor().is_finished()
    }

    /// Examples not yet read.
    fn ex_left(&self) -> usize {
        self.cursor().ex_left()
    }

    fn n_examples(&self) -> i32 {
        self.cursor().n_examples()
    }

    fn n_read(&self) -> i32 {
        self.cursor().n_read()
    }

    fn state(&self) -> ReaderState {
        self.cursor().state()
    }

    fn header(&self) -> &ExampleHeader {
        self.cursor().header()
    }

    fn batch_size(&self) -> usize {
        self.cursor().batch_size()
    }

    fn ex_size_bytes(&self) -> usize {
        self.cursor().ex_size_bytes()
    }

    fn batch_size_bytes(&self) -> usize {
        self.cursor().batch_size_bytes()
    }
}

/// Reader over an unlabeled dataset (examples and identifiers only).
///
/// Streams are opened eagerly by the constructor and released when the
/// reader is dropped, whether or not the dataset was read to the end.
pub struct Reader {
    cursor: RecordCursor,
    // Set by the iterator once a read fails.
    failed: bool,
}

impl Reader {
    /// Opens a dataset on the local filesystem with default options.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::Path`](crate::ReaderError::Path) if either file
    ///   cannot be opened.
    /// - [`ReaderError::Format`](crate::ReaderError::Format) if the example
    ///   header is invalid.
    pub fn new(
        example_path: impl AsRef<Path>,
        id_path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<Self> {
        let storage = LocalStorage::new(&StorageConfig::default());
        Self::open(
            &storage,
            example_path.as_ref(),
            id_path.as_ref(),
            batch_size,
            &DatasetConfig::default(),
        )
    }

    /// Opens a dataset through an arbitrary storage backend.
    pub fn open(
        storage: &dyn StorageBackend,
        example_path: &Path,
        id_path: &Path,
        batch_size: usize,
        options: &DatasetConfig,
    ) -> Result<Self> {
        let cursor = RecordCursor::open(storage, example_path, id_path, batch_size, options)?;

        tracing::info!(
            examples = %example_path.display(),
            n_examples = cursor.n_examples(),
            shape = ?cursor.header().shape(),
            batch_size,
            "opened reader"
        );

        Ok(Self {
            cursor,
            failed: false,
        })
    }

    /// Releases the streams. Equivalent to dropping the reader.
    pub fn close(self) {
        tracing::debug!(n_read = self.cursor.n_read(), "closing reader");
    }
}

impl BatchSource for Reader {
    fn cursor(&self) -> &RecordCursor {
        &self.cursor
    }

    fn get_next_batch(&mut self) -> Result<Batch> {
        let count = self.cursor.next_count()?;
        let (examples, ids) = self.cursor.read_records(count)?;
        let (first_index, batch_index) = self.cursor.advance(count);

        tracing::debug!(batch_index, count, "read batch");

        Ok(Batch::new(
            examples,
            ids,
            self.cursor.header().shape(),
            self.cursor.example_layout(),
            first_index,
            batch_index,
        ))
    }
}

/// Yields batches until the dataset is exhausted or a read fails.
///
/// A failed read leaves the cursor in place, so retrying would fail the same
/// way; the iterator yields the error once and then returns `None`.
/// [`BatchSource::get_next_batch`] can still be called directly afterwards.
impl Iterator for Reader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_finished() {
            return None;
        }
        let batch = self.get_next_batch();
        self.failed = batch.is_err();
        Some(batch)
    }
}

impl FusedIterator for Reader {}
