// rust/batch-reader/src/dataset/writer.rs

//! Dataset writer producing the files the readers consume.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ReaderError, Result};
use crate::storage::{StorageBackend, StorageWriter};

use super::format::{
    ElementType, ExampleHeader, LabelHeader, RecordLayout, EXAMPLE_STREAM, LABEL_STREAM,
};

struct LabelSink {
    writer: Box<dyn StorageWriter>,
    path: PathBuf,
    layout: RecordLayout,
}

/// Writes an example file, its identifier file and optionally a label file.
///
/// The example count is part of both headers, so it has to be known up
/// front; [`finish`](Self::finish) fails if a different number of examples
/// was written.
///
/// Record width and count errors are detected before anything is written
/// and leave the writer usable. A storage error while appending a record can
/// leave the files holding different record counts; from then on every write
/// and `finish` fail, and the partial files should be discarded.
///
/// # Example
///
/// ```no_run
/// use batch_reader::config::StorageConfig;
/// use batch_reader::dataset::{DatasetWriter, ElementType, ExampleHeader};
/// use batch_reader::storage::LocalStorage;
/// use std::path::Path;
///
/// let storage = LocalStorage::new(&StorageConfig::default());
/// let header = ExampleHeader::new(2, 1, 1, 1);
/// let mut writer = DatasetWriter::create(
///     &storage,
///     Path::new("imgdata.dat"),
///     Path::new("nmdata.dat"),
///     header,
///     ElementType::F32,
/// )
/// .unwrap()
/// .with_labels(&storage, Path::new("lbldata.dat"), 2, ElementType::F32)
/// .unwrap();
///
/// let one_hot = |class: usize| -> Vec<u8> {
///     (0..2).flat_map(|c| (if c == class { 1.0f32 } else { 0.0 }).to_le_bytes()).collect()
/// };
/// writer.write_labeled(7, &1.5f32.to_le_bytes(), &one_hot(0)).unwrap();
/// writer.write_labeled(9, &0.5f32.to_le_bytes(), &one_hot(1)).unwrap();
/// writer.finish().unwrap();
/// ```
pub struct DatasetWriter {
    examples: Box<dyn StorageWriter>,
    example_path: PathBuf,
    ids: Box<dyn StorageWriter>,
    id_path: PathBuf,
    labels: Option<LabelSink>,
    header: ExampleHeader,
    layout: RecordLayout,
    written: i32,
    // Set when a record was only partly written.
    poisoned: bool,
}

impl DatasetWriter {
    /// Creates the example and identifier files and writes the example header.
    pub fn create(
        storage: &dyn StorageBackend,
        example_path: &Path,
        id_path: &Path,
        header: ExampleHeader,
        element_type: ElementType,
    ) -> Result<Self> {
        header.validate()?;
        let layout = header.layout(element_type)?;

        let mut examples = storage.open_write(example_path)?;
        header.write_to(&mut *examples).map_err(|e| {
            ReaderError::storage_with_source(example_path, "failed to write example header", e)
        })?;
        let ids = storage.open_write(id_path)?;

        Ok(Self {
            examples,
            example_path: example_path.to_path_buf(),
            ids,
            id_path: id_path.to_path_buf(),
            labels: None,
            header,
            layout,
            written: 0,
            poisoned: false,
        })
    }

    /// Adds a label file whose header declares the same record count as the
    /// example file.
    pub fn with_labels(
        mut self,
        storage: &dyn StorageBackend,
        label_path: &Path,
        label_width: i32,
        element_type: ElementType,
    ) -> Result<Self> {
        let label_header = LabelHeader::new(self.header.n_examples, label_width);
        label_header.validate()?;
        let layout = label_header.layout(element_type)?;

        let mut writer = storage.open_write(label_path)?;
        label_header.write_to(&mut *writer).map_err(|e| {
            ReaderError::storage_with_source(label_path, "failed to write label header", e)
        })?;

        self.labels = Some(LabelSink {
            writer,
            path: label_path.to_path_buf(),
            layout,
        });
        Ok(self)
    }

    /// Appends one unlabeled example.
    pub fn write_example(&mut self, id: i32, example: &[u8]) -> Result<()> {
        if self.labels.is_some() {
            return Err(ReaderError::format(
                LABEL_STREAM,
                "dataset has a label file; use write_labeled",
            ));
        }
        self.append(id, example, None)
    }

    /// Appends one example together with its label record.
    pub fn write_labeled(&mut self, id: i32, example: &[u8], label: &[u8]) -> Result<()> {
        if self.labels.is_none() {
            return Err(ReaderError::format(
                LABEL_STREAM,
                "dataset has no label file; use write_example",
            ));
        }
        self.append(id, example, Some(label))
    }

    pub fn written(&self) -> i32 {
        self.written
    }

    fn append(&mut self, id: i32, example: &[u8], label: Option<&[u8]>) -> Result<()> {
        if self.poisoned {
            return Err(self.poisoned_error());
        }
        if self.written == self.header.n_examples {
            return Err(ReaderError::format(
                EXAMPLE_STREAM,
                format!(
                    "header declares {} examples, cannot write more",
                    self.header.n_examples
                ),
            ));
        }
        check_width(EXAMPLE_STREAM, example.len(), self.layout.record_bytes)?;
        if let (Some(label), Some(sink)) = (label, &self.labels) {
            check_width(LABEL_STREAM, label.len(), sink.layout.record_bytes)?;
        }

        if let Err(e) = self.write_record(id, example, label) {
            self.poisoned = true;
            tracing::warn!(
                examples = %self.example_path.display(),
                written = self.written,
                "dataset writer poisoned: {}",
                e
            );
            return Err(e);
        }
        self.written += 1;
        Ok(())
    }

    fn write_record(&mut self, id: i32, example: &[u8], label: Option<&[u8]>) -> Result<()> {
        self.examples.write_all(example).map_err(|e| {
            ReaderError::storage_with_source(&self.example_path, "failed to write example", e)
        })?;
        self.ids.write_all(&id.to_le_bytes()).map_err(|e| {
            ReaderError::storage_with_source(&self.id_path, "failed to write id", e)
        })?;
        if let (Some(label), Some(sink)) = (label, self.labels.as_mut()) {
            sink.writer.write_all(label).map_err(|e| {
                ReaderError::storage_with_source(&sink.path, "failed to write label", e)
            })?;
        }
        Ok(())
    }

    fn poisoned_error(&self) -> ReaderError {
        ReaderError::storage(
            &self.example_path,
            format!(
                "an earlier write failed after {} complete records; dataset files are out of sync",
                self.written
            ),
        )
    }

    /// Flushes and syncs every file.
    ///
    /// # Errors
    ///
    /// Returns a format error if fewer examples were written than the header
    /// declares; the files are still flushed in that case. Returns a storage
    /// error without flushing if an earlier append failed partway.
    pub fn finish(self) -> Result<()> {
        if self.poisoned {
            return Err(self.poisoned_error());
        }
        self.examples.finish()?;
        self.ids.finish()?;
        if let Some(sink) = self.labels {
            sink.writer.finish()?;
        }

        if self.written != self.header.n_examples {
            return Err(ReaderError::format(
                EXAMPLE_STREAM,
                format!(
                    "header declares {} examples but {} were written",
                    self.header.n_examples, self.written
                ),
            ));
        }

        tracing::info!(
            examples = %self.example_path.display(),
            n_examples = self.written,
            "finished writing dataset"
        );
        Ok(())
    }
}

fn check_width(stream: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(ReaderError::format(
            stream,
            format!("record is {actual} bytes, expected {expected}"),
        ));
    }
    Ok(())
}
