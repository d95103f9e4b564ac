// rust/batch-reader/src/dataset/format.rs

//! Dataset file format specification.
//!
//! All integers are little-endian. Headers are serialized with bincode's
//! fixed-width integer encoding, so they have a constant size on disk.
//!
//! Example file:
//! ```text
//! +------------------------------+
//! | n_examples, H, W, C (4x i32) |  <- ExampleHeader, 16 bytes
//! +------------------------------+
//! | example 0 (H*W*C elements)   |
//! | example 1                    |
//! | ...                          |
//! +------------------------------+
//! ```
//!
//! Identifier file: `n_examples` consecutive `i32` records, no header.
//!
//! Label file:
//! ```text
//! +---------------------------------+
//! | n_records, label_width (2x i32) |  <- LabelHeader, 8 bytes
//! +---------------------------------+
//! | label 0 (label_width elements)  |
//! | label 1                         |
//! | ...                             |
//! +---------------------------------+
//! ```
//!
//! Element types of the example and label payloads are not stored in the
//! files; they come from [`DatasetConfig`](crate::config::DatasetConfig).

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, Result};

pub(crate) const EXAMPLE_STREAM: &str = "example";
pub(crate) const ID_STREAM: &str = "id";
pub(crate) const LABEL_STREAM: &str = "label";

/// Width in bytes of one identifier record.
pub const ID_RECORD_BYTES: usize = 4;

/// Width of a single payload element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Raw bytes (e.g. undecoded 8-bit pixels).
    U8,
    /// IEEE half precision.
    F16,
    /// IEEE single precision.
    #[default]
    F32,
    /// IEEE double precision.
    F64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn width(self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::F16 => 2,
            ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementType::U8 => "u8",
            ElementType::F16 => "f16",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "u8" | "byte" => Ok(ElementType::U8),
            "f16" | "half" => Ok(ElementType::F16),
            "f32" | "float" => Ok(ElementType::F32),
            "f64" | "double" => Ok(ElementType::F64),
            other => Err(ReaderError::config(format!(
                "unknown element type '{other}': expected u8, f16, f32 or f64"
            ))),
        }
    }
}

/// Byte geometry of one fixed-width record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Elements per record.
    pub elements: usize,
    /// Element type of the payload.
    pub element_type: ElementType,
    /// Bytes per record (`elements * element_type.width()`).
    pub record_bytes: usize,
}

impl RecordLayout {
    fn new(stream: &'static str, elements: usize, element_type: ElementType) -> Result<Self> {
        let record_bytes = elements.checked_mul(element_type.width()).ok_or_else(|| {
            ReaderError::format(
                stream,
                format!("{elements} {element_type} elements per record overflow usize"),
            )
        })?;
        Ok(Self {
            elements,
            element_type,
            record_bytes,
        })
    }

    /// Bytes occupied by `records` consecutive records.
    pub fn bytes_for(&self, stream: &'static str, records: usize) -> Result<usize> {
        records.checked_mul(self.record_bytes).ok_or_else(|| {
            ReaderError::format(
                stream,
                format!(
                    "{records} records of {} bytes overflow usize",
                    self.record_bytes
                ),
            )
        })
    }

    /// Total byte length of a stream holding `records` records after a
    /// header of `header_len` bytes.
    pub(crate) fn stream_len(
        &self,
        stream: &'static str,
        header_len: u64,
        records: i32,
    ) -> Result<u64> {
        (records as u64)
            .checked_mul(self.record_bytes as u64)
            .and_then(|body| body.checked_add(header_len))
            .ok_or_else(|| {
                ReaderError::format(stream, format!("{records} records overflow the stream size"))
            })
    }
}

/// Header record at the start of every example file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleHeader {
    pub n_examples: i32,
    pub height: i32,
    pub width: i32,
    pub channels: i32,
}

impl ExampleHeader {
    /// Encoded size of the header in bytes.
    pub const LEN: usize = 16;

    pub fn new(n_examples: i32, height: i32, width: i32, channels: i32) -> Self {
        Self {
            n_examples,
            height,
            width,
            channels,
        }
    }

    /// Reads and validates a header from the start of an example stream.
    ///
    /// # Errors
    ///
    /// Returns a format error if the stream holds fewer than [`Self::LEN`]
    /// bytes or any field is out of range.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; Self::LEN];
        reader.read_exact(&mut buf).map_err(|e| {
            ReaderError::format_with_source(EXAMPLE_STREAM, "header is truncated", e)
        })?;

        let header: Self = bincode::deserialize(&buf).map_err(|e| {
            ReaderError::format_with_source(EXAMPLE_STREAM, "failed to decode header", e)
        })?;
        header.validate()?;
        Ok(header)
    }

    /// Writes the header in its on-disk encoding.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(&bytes)
    }

    /// Checks that every field is in range.
    pub fn validate(&self) -> Result<()> {
        if self.n_examples < 0 {
            return Err(ReaderError::format(
                EXAMPLE_STREAM,
                format!("n_examples must not be negative, got {}", self.n_examples),
            ));
        }
        for (name, value) in [
            ("ex_H", self.height),
            ("ex_W", self.width),
            ("ex_C", self.channels),
        ] {
            if value <= 0 {
                return Err(ReaderError::format(
                    EXAMPLE_STREAM,
                    format!("{name} must be positive, got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Elements per example (`H * W * C`).
    pub fn elements(&self) -> Result<usize> {
        (self.height as usize)
            .checked_mul(self.width as usize)
            .and_then(|hw| hw.checked_mul(self.channels as usize))
            .ok_or_else(|| {
                ReaderError::format(
                    EXAMPLE_STREAM,
                    format!(
                        "{}x{}x{} elements per example overflow usize",
                        self.height, self.width, self.channels
                    ),
                )
            })
    }

    /// Record layout of one example for the given element type.
    pub fn layout(&self, element_type: ElementType) -> Result<RecordLayout> {
        RecordLayout::new(EXAMPLE_STREAM, self.elements()?, element_type)
    }

    /// `(H, W, C)` as unsigned dimensions.
    pub fn shape(&self) -> [usize; 3] {
        [
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        ]
    }
}

/// Header record at the start of every label file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelHeader {
    /// Number of label records; must match the example file.
    pub n_records: i32,
    /// Elements per label record.
    pub label_width: i32,
}

impl LabelHeader {
    /// Encoded size of the header in bytes.
    pub const LEN: usize = 8;

    pub fn new(n_records: i32, label_width: i32) -> Self {
        Self {
            n_records,
            label_width,
        }
    }

    /// Reads and validates a header from the start of a label stream.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; Self::LEN];
        reader.read_exact(&mut buf).map_err(|e| {
            ReaderError::format_with_source(LABEL_STREAM, "header is truncated", e)
        })?;

        let header: Self = bincode::deserialize(&buf).map_err(|e| {
            ReaderError::format_with_source(LABEL_STREAM, "failed to decode header", e)
        })?;
        header.validate()?;
        Ok(header)
    }

    /// Writes the header in its on-disk encoding.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(&bytes)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_records < 0 {
            return Err(ReaderError::format(
                LABEL_STREAM,
                format!("n_records must not be negative, got {}", self.n_records),
            ));
        }
        if self.label_width <= 0 {
            return Err(ReaderError::format(
                LABEL_STREAM,
                format!("label_width must be positive, got {}", self.label_width),
            ));
        }
        Ok(())
    }

    /// Record layout of one label for the given element type.
    pub fn layout(&self, element_type: ElementType) -> Result<RecordLayout> {
        RecordLayout::new(LABEL_STREAM, self.label_width as usize, element_type)
    }
}
