// rust/batch-reader/src/dataset/labeled.rs

use std::io::{Seek, SeekFrom};
use std::iter::FusedIterator;
use std::path::Path;

use crate::config::{DatasetConfig, StorageConfig};
use crate::error::{ReaderError, Result};
use crate::storage::{LocalStorage, StorageBackend, StorageReader};

use super::batch::Batch;
use super::cursor::{check_stream_len, read_exact_records, RecordCursor};
use super::format::{LabelHeader, RecordLayout, LABEL_STREAM};
use super::reader::BatchSource;

/// Reader over a training dataset: examples, identifiers and labels.
///
/// The label stream advances in lockstep with the example and identifier
/// streams. Its header must declare exactly as many records as the example
/// header; a mismatch is rejected when the reader is opened.
pub struct LabeledReader {
    cursor: RecordCursor,
    labels: Box<dyn StorageReader>,
    label_header: LabelHeader,
    label_layout: RecordLayout,
    // Set by the iterator once a read fails.
    failed: bool,
}

impl LabeledReader {
    /// Opens a labeled dataset on the local filesystem with default options.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::Path`] if any of the three files cannot be opened.
    /// - [`ReaderError::Format`] if the example or label header is invalid.
    /// - [`ReaderError::Consistency`] if the label count differs from the
    ///   example count.
    pub fn new(
        example_path: impl AsRef<Path>,
        id_path: impl AsRef<Path>,
        label_path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<Self> {
        let storage = LocalStorage::new(&StorageConfig::default());
        Self::open(
            &storage,
            example_path.as_ref(),
            id_path.as_ref(),
            label_path.as_ref(),
            batch_size,
            &DatasetConfig::default(),
        )
    }

    /// Opens a labeled dataset through an arbitrary storage backend.
    ///
    /// Streams opened before a failure are released before the error is
    /// returned.
    pub fn open(
        storage: &dyn StorageBackend,
        example_path: &Path,
        id_path: &Path,
        label_path: &Path,
        batch_size: usize,
        options: &DatasetConfig,
    ) -> Result<Self> {
        let cursor = RecordCursor::open(storage, example_path, id_path, batch_size, options)?;

        let mut labels = storage.open_read(label_path)?;
        let label_header = LabelHeader::read_from(&mut *labels)?;
        if label_header.n_records != cursor.n_examples() {
            return Err(ReaderError::consistency(
                cursor.n_examples(),
                label_header.n_records,
            ));
        }

        let label_layout = label_header.layout(options.label_element_type)?;
        label_layout.bytes_for(LABEL_STREAM, batch_size)?;
        let label_stream_len =
            label_layout.stream_len(LABEL_STREAM, LabelHeader::LEN as u64, label_header.n_records)?;

        if options.verify_stream_lengths {
            check_stream_len(LABEL_STREAM, &*labels, label_stream_len)?;
        }

        tracing::info!(
            examples = %example_path.display(),
            labels = %label_path.display(),
            n_examples = cursor.n_examples(),
            shape = ?cursor.header().shape(),
            label_width = label_header.label_width,
            batch_size,
            "opened labeled reader"
        );

        Ok(Self {
            cursor,
            labels,
            label_header,
            label_layout,
            failed: false,
        })
    }

    pub fn label_header(&self) -> &LabelHeader {
        &self.label_header
    }

    /// Bytes per label record.
    pub fn label_size_bytes(&self) -> usize {
        self.label_layout.record_bytes
    }

    /// Releases all three streams. Equivalent to dropping the reader.
    pub fn close(self) {
        tracing::debug!(n_read = self.cursor.n_read(), "closing labeled reader");
    }

    fn read_labels(&mut self, count: usize) -> Result<Vec<u8>> {
        read_exact_records(
            &mut *self.labels,
            LABEL_STREAM,
            self.label_layout.record_bytes,
            count,
        )
    }

    /// Seeks the label stream back to the record at the current cursor.
    fn rewind_labels(&mut self) {
        let offset = LabelHeader::LEN as u64
            + self.cursor.n_read() as u64 * self.label_layout.record_bytes as u64;
        if let Err(e) = self.labels.seek(SeekFrom::Start(offset)) {
            tracing::warn!("failed to rewind label stream: {}", e);
        }
    }
}

impl BatchSource for LabeledReader {
    fn cursor(&self) -> &RecordCursor {
        &self.cursor
    }

    fn get_next_batch(&mut self) -> Result<Batch> {
        let count = self.cursor.next_count()?;
        let (examples, ids) = self.cursor.read_records(count)?;
        let labels = match self.read_labels(count) {
            Ok(labels) => labels,
            Err(e) => {
                self.cursor.rewind();
                self.rewind_labels();
                return Err(e);
            }
        };
        let (first_index, batch_index) = self.cursor.advance(count);

        tracing::debug!(batch_index, count, "read labeled batch");

        Ok(Batch::new(
            examples,
            ids,
            self.cursor.header().shape(),
            self.cursor.example_layout(),
            first_index,
            batch_index,
        )
        .with_labels(labels, self.label_layout))
    }
}

/// Yields batches until the dataset is exhausted or a read fails; after the
/// first error the iterator returns `None`, as [`Reader`](super::Reader)'s does.
impl Iterator for LabeledReader {
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

impl FusedIterator for LabeledReader {}
