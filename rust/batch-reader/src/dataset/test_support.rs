// rust/batch-reader/src/dataset/test_support.rs

//! Fixtures shared by the reader and writer tests.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ReaderError, Result};
use crate::storage::{StorageBackend, StorageReader, StorageWriter};

/// Encodes `ints` as little-endian `i32` values followed by `body`.
pub(crate) fn encode_records(ints: &[i32], body: &[u8]) -> Vec<u8> {
    let mut bytes: Vec<u8> = ints.iter().flat_map(|v| v.to_le_bytes()).collect();
    bytes.extend_from_slice(body);
    bytes
}

/// Writes `ints` as little-endian `i32` values followed by `body`.
pub(crate) fn write_raw(dir: &Path, name: &str, ints: &[i32], body: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode_records(ints, body)).unwrap();
    path
}

/// Payload of example `index` with `len` bytes.
pub(crate) fn example_payload(index: usize, len: usize) -> Vec<u8> {
    (0..len).map(|b| (index * 31 + b) as u8).collect()
}

/// One-hot `f32` label of `width` elements for example `index`.
pub(crate) fn label_payload(index: usize, width: usize) -> Vec<u8> {
    (0..width)
        .flat_map(|class| {
            let value: f32 = if class == index % width { 1.0 } else { 0.0 };
            value.to_le_bytes()
        })
        .collect()
}

/// Writes an `f32` example file and its id file (`100 + index`).
pub(crate) fn write_dataset(dir: &Path, n_examples: i32, shape: [i32; 3]) -> (PathBuf, PathBuf) {
    let record_bytes = (shape[0] * shape[1] * shape[2]) as usize * 4;
    let body: Vec<u8> = (0..n_examples as usize)
        .flat_map(|i| example_payload(i, record_bytes))
        .collect();

    let examples = write_raw(
        dir,
        "examples.dat",
        &[n_examples, shape[0], shape[1], shape[2]],
        &body,
    );
    let ids: Vec<i32> = (0..n_examples).map(|i| 100 + i).collect();
    let ids = write_raw(dir, "ids.dat", &ids, &[]);
    (examples, ids)
}

/// Writes a label file with `n_records` declared and `n_written` one-hot
/// records actually present.
pub(crate) fn write_labels(dir: &Path, n_records: i32, n_written: usize, width: i32) -> PathBuf {
    let body: Vec<u8> = (0..n_written)
        .flat_map(|i| label_payload(i, width as usize))
        .collect();
    write_raw(dir, "labels.dat", &[n_records, width], &body)
}

type Files = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

/// In-memory storage backend that counts the reads and seeks issued on the
/// streams it hands out.
#[derive(Default)]
pub(crate) struct MemoryStorage {
    files: Files,
    reads: Arc<AtomicUsize>,
    seeks: Arc<AtomicUsize>,
    write_limits: Mutex<HashMap<PathBuf, usize>>,
}

impl MemoryStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_file(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.lock().unwrap().insert(path.into(), data);
    }

    /// Contents of a file whose writer was finished.
    pub(crate) fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Makes writes to `path` fail once they would exceed `limit` bytes.
    pub(crate) fn fail_writes_after(&self, path: impl Into<PathBuf>, limit: usize) {
        self.write_limits.lock().unwrap().insert(path.into(), limit);
    }

    /// `(reads, seeks)` issued since creation or the last reset.
    pub(crate) fn stream_ops(&self) -> (usize, usize) {
        (
            self.reads.load(Ordering::SeqCst),
            self.seeks.load(Ordering::SeqCst),
        )
    }

    pub(crate) fn reset_stream_ops(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.seeks.store(0, Ordering::SeqCst);
    }
}

struct CountingReader {
    data: Cursor<Vec<u8>>,
    size: u64,
    reads: Arc<AtomicUsize>,
    seeks: Arc<AtomicUsize>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.data.read(buf)
    }
}

impl Seek for CountingReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.seeks.fetch_add(1, Ordering::SeqCst);
        self.data.seek(pos)
    }
}

impl StorageReader for CountingReader {
    fn size(&self) -> u64 {
        self.size
    }
}

struct MemoryWriter {
    path: PathBuf,
    data: Vec<u8>,
    limit: Option<usize>,
    files: Files,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(limit) = self.limit {
            if self.data.len() + buf.len() > limit {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "device full",
                ));
            }
        }
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl StorageWriter for MemoryWriter {
    fn finish(self: Box<Self>) -> Result<()> {
        let writer = *self;
        writer.files.lock().unwrap().insert(writer.path, writer.data);
        Ok(())
    }
}

impl StorageBackend for MemoryStorage {
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
        let data = self.file(path).ok_or_else(|| {
            ReaderError::path_with_source(
                path,
                "failed to open file",
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )
        })?;

        let size = data.len() as u64;
        Ok(Box::new(CountingReader {
            data: Cursor::new(data),
            size,
            reads: self.reads.clone(),
            seeks: self.seeks.clone(),
        }))
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>> {
        let limit = self.write_limits.lock().unwrap().get(path).copied();
        Ok(Box::new(MemoryWriter {
            path: path.to_path_buf(),
            data: Vec::new(),
            limit,
            files: self.files.clone(),
        }))
    }
}
