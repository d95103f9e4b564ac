// rust/batch-reader/src/dataset/cursor.rs

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::config::DatasetConfig;
use crate::error::{ReaderError, Result};
use crate::storage::{StorageBackend, StorageReader};

use super::format::{
    ExampleHeader, RecordLayout, EXAMPLE_STREAM, ID_RECORD_BYTES, ID_STREAM,
};

/// Lifecycle state of a reader.
///
/// A dropped reader is closed; there is no value to query at that point, so
/// the closed state has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// At least one example is left to read.
    Open,
    /// Every example has been handed out.
    Exhausted,
}

/// Shared read position over the example and identifier streams.
///
/// Both [`Reader`](super::Reader) and [`LabeledReader`](super::LabeledReader)
/// embed one cursor, which owns the two streams, the parsed example header
/// and the count of examples already consumed.
pub struct RecordCursor {
    examples: Box<dyn StorageReader>,
    ids: Box<dyn StorageReader>,
    header: ExampleHeader,
    layout: RecordLayout,
    batch_size: usize,
    batch_size_bytes: usize,
    n_read: i32,
    batches_read: u64,
}

impl RecordCursor {
    /// Opens the example and identifier streams and parses the header.
    ///
    /// If the identifier stream cannot be opened, the already opened example
    /// stream is dropped before the error is returned.
    pub(crate) fn open(
        storage: &dyn StorageBackend,
        example_path: &Path,
        id_path: &Path,
        batch_size: usize,
        options: &DatasetConfig,
    ) -> Result<Self> {
        if batch_size == 0 || batch_size > i32::MAX as usize {
            return Err(ReaderError::config(format!(
                "batch_size must be in 1..={}, got {batch_size}",
                i32::MAX
            )));
        }

        let mut examples = storage.open_read(example_path)?;
        let header = ExampleHeader::read_from(&mut *examples)?;
        let layout = header.layout(options.element_type)?;
        let batch_size_bytes = layout.bytes_for(EXAMPLE_STREAM, batch_size)?;
        let example_stream_len =
            layout.stream_len(EXAMPLE_STREAM, ExampleHeader::LEN as u64, header.n_examples)?;

        let ids = storage.open_read(id_path)?;

        if options.verify_stream_lengths {
            let id_stream_len = header.n_examples as u64 * ID_RECORD_BYTES as u64;
            check_stream_len(EXAMPLE_STREAM, &*examples, example_stream_len)?;
            check_stream_len(ID_STREAM, &*ids, id_stream_len)?;
        }

        tracing::debug!(
            n_examples = header.n_examples,
            ex_size_bytes = layout.record_bytes,
            batch_size,
            "opened example and id streams"
        );

        Ok(Self {
            examples,
            ids,
            header,
            layout,
            batch_size,
            batch_size_bytes,
            n_read: 0,
            batches_read: 0,
        })
    }

    pub fn header(&self) -> &ExampleHeader {
        &self.header
    }

    pub fn example_layout(&self) -> RecordLayout {
        self.layout
    }

    pub fn n_examples(&self) -> i32 {
        self.header.n_examples
    }

    pub fn n_read(&self) -> i32 {
        self.n_read
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn ex_size_bytes(&self) -> usize {
        self.layout.record_bytes
    }

    pub fn batch_size_bytes(&self) -> usize {
        self.batch_size_bytes
    }

    pub fn batches_read(&self) -> u64 {
        self.batches_read
    }

    pub fn is_finished(&self) -> bool {
        self.n_read == self.header.n_examples
    }

    pub fn ex_left(&self) -> usize {
        (self.header.n_examples - self.n_read) as usize
    }

    pub fn state(&self) -> ReaderState {
        if self.is_finished() {
            ReaderState::Exhausted
        } else {
            ReaderState::Open
        }
    }

    /// Size of the next batch, or a usage error once exhausted.
    pub(crate) fn next_count(&self) -> Result<usize> {
        if self.is_finished() {
            return Err(ReaderError::usage(self.header.n_examples));
        }
        Ok(self.batch_size.min(self.ex_left()))
    }

    /// Reads `count` example and identifier records.
    ///
    /// On failure both streams are rewound to the current cursor, so the
    /// reader is left exactly as it was before the call.
    pub(crate) fn read_records(&mut self, count: usize) -> Result<(Vec<u8>, Vec<i32>)> {
        match self.read_records_inner(count) {
            Ok(records) => Ok(records),
            Err(e) => {
                self.rewind();
                Err(e)
            }
        }
    }

    fn read_records_inner(&mut self, count: usize) -> Result<(Vec<u8>, Vec<i32>)> {
        let examples = read_exact_records(
            &mut *self.examples,
            EXAMPLE_STREAM,
            self.layout.record_bytes,
            count,
        )?;
        let raw_ids = read_exact_records(&mut *self.ids, ID_STREAM, ID_RECORD_BYTES, count)?;

        let ids = raw_ids
            .chunks_exact(ID_RECORD_BYTES)
            .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok((examples, ids))
    }

    /// Seeks both streams back to the record at the current cursor.
    pub(crate) fn rewind(&mut self) {
        let n_read = self.n_read as u64;
        let example_offset = ExampleHeader::LEN as u64 + n_read * self.layout.record_bytes as u64;
        let id_offset = n_read * ID_RECORD_BYTES as u64;

        if let Err(e) = self.examples.seek(SeekFrom::Start(example_offset)) {
            tracing::warn!("failed to rewind example stream: {}", e);
        }
        if let Err(e) = self.ids.seek(SeekFrom::Start(id_offset)) {
            tracing::warn!("failed to rewind id stream: {}", e);
        }
    }

    /// Moves the cursor past `count` records that were read successfully.
    ///
    /// Returns the dataset index of the first record and the batch index.
    pub(crate) fn advance(&mut self, count: usize) -> (usize, u64) {
        let position = (self.n_read as usize, self.batches_read);
        self.n_read += count as i32;
        self.batches_read += 1;

        if self.is_finished() {
            tracing::info!(
                n_examples = self.header.n_examples,
                batches = self.batches_read,
                "dataset exhausted"
            );
        }
        position
    }
}

/// Reads exactly `count` records of `record_bytes` bytes from `stream`.
///
/// The bytes left in the stream are checked before the buffer is allocated,
/// so a header that promises more data than the file holds yields an I/O
/// error rather than an allocation sized from the header.
pub(crate) fn read_exact_records(
    stream: &mut dyn StorageReader,
    name: &'static str,
    record_bytes: usize,
    count: usize,
) -> Result<Vec<u8>> {
    let size = stream.size();
    let wanted = count.checked_mul(record_bytes).ok_or_else(|| {
        ReaderError::io(
            name,
            format!("{count} records of {record_bytes} bytes overflow usize"),
        )
    })?;
    let position = stream.stream_position().map_err(|e| {
        ReaderError::io_with_source(name, "failed to query stream position", e)
    })?;
    let available = size.saturating_sub(position);
    if available < wanted as u64 {
        return Err(ReaderError::io(
            name,
            format!(
                "expected {count} records ({wanted} bytes), only {available} of {size} bytes left"
            ),
        ));
    }

    let mut buf = vec![0u8; wanted];
    stream.read_exact(&mut buf).map_err(|e| {
        ReaderError::io_with_source(
            name,
            format!("expected {count} records ({wanted} bytes), stream of {size} bytes ended early"),
            e,
        )
    })?;
    Ok(buf)
}

/// Fails with an I/O error when a stream is shorter than its header promises.
pub(crate) fn check_stream_len(
    name: &'static str,
    stream: &dyn StorageReader,
    expected: u64,
) -> Result<()> {
    let actual = stream.size();
    if actual < expected {
        return Err(ReaderError::io(
            name,
            format!("stream holds {actual} bytes but its header requires {expected}"),
        ));
    }
    if actual > expected {
        tracing::warn!(
            stream = name,
            actual,
            expected,
            "stream has trailing bytes beyond the declared records"
        );
    }
    Ok(())
}
