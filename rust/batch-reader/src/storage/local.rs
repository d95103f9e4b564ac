// rust/batch-reader/src/storage/local.rs

//! Local filesystem storage backend implementation.
//!
//! Dataset files are read either through a `BufReader` or, for files above
//! the configured threshold, through a read-only memory map.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::traits::{StorageBackend, StorageReader, StorageWriter};
use crate::config::StorageConfig;
use crate::error::{ReaderError, Result};

/// Local filesystem storage backend.
pub struct LocalStorage {
    /// Base path that relative paths are resolved against.
    base_path: PathBuf,
    /// Buffer size for buffered I/O operations.
    buffer_size: usize,
    /// Whether to use memory-mapped I/O.
    use_mmap: bool,
    /// File size threshold above which to use mmap.
    mmap_threshold: u64,
}

impl LocalStorage {
    /// Creates a new `LocalStorage` instance from configuration.
    ///
    /// Unlike a writable store, the base path is not created; a missing
    /// base path simply makes every relative open fail with a path error.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            base_path: config.base_path.clone(),
            buffer_size: config.buffer_size,
            use_mmap: config.use_mmap,
            mmap_threshold: config.mmap_threshold,
        }
    }

    /// Resolves a path relative to the base path.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

impl StorageBackend for LocalStorage {
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
        let full_path = self.resolve_path(path);
        let file = File::open(&full_path)
            .map_err(|e| ReaderError::path_with_source(&full_path, "failed to open file", e))?;

        let meta = file.metadata().map_err(|e| {
            ReaderError::path_with_source(&full_path, "failed to read file metadata", e)
        })?;
        if meta.is_dir() {
            return Err(ReaderError::Path {
                path: full_path,
                message: "path is a directory".to_string(),
                source: None,
            });
        }
        let size = meta.len();

        if self.use_mmap && size >= self.mmap_threshold && size > 0 {
            // SAFETY: The file is opened read-only and the Mmap is owned by
            // the reader for its whole lifetime.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
                ReaderError::path_with_source(&full_path, "failed to memory-map file", e)
            })?;

            tracing::debug!(path = %full_path.display(), size, "opened memory-mapped stream");
            Ok(Box::new(MmapReader::new(mmap)))
        } else {
            tracing::debug!(path = %full_path.display(), size, "opened buffered stream");
            Ok(Box::new(LocalReader::new(file, size, self.buffer_size)))
        }
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>> {
        let full_path = self.resolve_path(path);

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ReaderError::storage_with_source(
                        parent,
                        "failed to create parent directories",
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)
            .map_err(|e| {
                ReaderError::storage_with_source(&full_path, "failed to create file", e)
            })?;

        Ok(Box::new(LocalWriter::new(file, full_path, self.buffer_size)))
    }
}

/// Buffered file reader for local storage.
struct LocalReader {
    reader: BufReader<File>,
    size: u64,
}

impl LocalReader {
    fn new(file: File, size: u64, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, file),
            size,
        }
    }
}

impl Read for LocalReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for LocalReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.reader.seek(pos)
    }

    // Keeps the read buffer; `seek(Current(0))` would discard it.
    fn stream_position(&mut self) -> std::io::Result<u64> {
        self.reader.stream_position()
    }
}

impl StorageReader for LocalReader {
    fn size(&self) -> u64 {
        self.size
    }
}

/// Memory-mapped file reader for local storage.
struct MmapReader {
    mmap: Mmap,
    pos: u64,
}

impl MmapReader {
    fn new(mmap: Mmap) -> Self {
        Self { mmap, pos: 0 }
    }
}

impl Read for MmapReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let start = (self.pos as usize).min(self.mmap.len());
        let remaining = &self.mmap[start..];
        let to_read = buf.len().min(remaining.len());

        buf[..to_read].copy_from_slice(&remaining[..to_read]);
        self.pos += to_read as u64;
        Ok(to_read)
    }
}

impl Seek for MmapReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.mmap.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };

        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to negative position",
            ));
        }

        self.pos = new_pos as u64;
        Ok(self.pos)
    }
}

impl StorageReader for MmapReader {
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }
}

/// Buffered file writer for local storage.
struct LocalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl LocalWriter {
    fn new(file: File, path: PathBuf, buffer_size: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(buffer_size, file),
            path,
        }
    }
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageWriter for LocalWriter {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer.flush().map_err(|e| {
            ReaderError::storage_with_source(&self.path, "failed to flush writer", e)
        })?;

        // Sync to disk
        self.writer.get_ref().sync_all().map_err(|e| {
            ReaderError::storage_with_source(&self.path, "failed to sync file to disk", e)
        })?;

        Ok(())
    }
}
