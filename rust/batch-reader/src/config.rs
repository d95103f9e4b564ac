// rust/batch-reader/src/config.rs

//! Configuration management for the batch reader.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values. Dataset file
//! paths are deliberately not part of the configuration; callers pass them
//! to [`Loader`](crate::Loader) directly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::dataset::ElementType;
use crate::error::{ReaderError, Result};

// Top-level reader configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub storage: StorageConfig,
    pub dataset: DatasetConfig,
}

// Storage configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Base path that relative dataset paths are resolved against.
    pub base_path: PathBuf,
    // Buffer size in bytes for buffered stream I/O.
    pub buffer_size: usize,
    // Whether to memory-map large dataset files.
    pub use_mmap: bool,
    // File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

/// Dataset encoding and batching options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Default number of examples per batch.
    pub batch_size: usize,
    /// Element type of the example payload (`H*W*C` elements per example).
    pub element_type: ElementType,
    /// Element type of each label record (`label_width` elements per label).
    pub label_element_type: ElementType,
    /// Compare stream sizes against their headers when a reader is opened.
    pub verify_stream_lengths: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            buffer_size: 64 * 1024, // 64 KB
            use_mmap: true,
            mmap_threshold: 1024 * 1024, // 1 MB
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            element_type: ElementType::F32,
            label_element_type: ElementType::F32,
            verify_stream_lengths: false,
        }
    }
}

impl FromStr for ReaderConfig {
    type Err = ReaderError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| ReaderError::config_with_source("failed to parse TOML config", e))
    }
}

impl ReaderConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReaderError::path_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `FBR_` and use underscores
    // to separate nested fields. For example:
    // - `FBR_STORAGE_BASE_PATH` overrides `storage.base_path`
    // - `FBR_STORAGE_USE_MMAP` overrides `storage.use_mmap`
    // - `FBR_DATASET_BATCH_SIZE` overrides `dataset.batch_size`
    // - `FBR_DATASET_ELEMENT_TYPE` overrides `dataset.element_type` ("f32", "u8", ...)
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(val) = std::env::var("FBR_STORAGE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("FBR_STORAGE_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.storage.buffer_size = v;
            }
        }
        if let Ok(val) = std::env::var("FBR_STORAGE_USE_MMAP") {
            if let Ok(v) = val.parse() {
                self.storage.use_mmap = v;
            }
        }
        if let Ok(val) = std::env::var("FBR_STORAGE_MMAP_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.storage.mmap_threshold = v;
            }
        }

        // Dataset overrides
        if let Ok(val) = std::env::var("FBR_DATASET_BATCH_SIZE") {
            if let Ok(v) = val.parse() {
                self.dataset.batch_size = v;
            }
        }
        if let Ok(val) = std::env::var("FBR_DATASET_ELEMENT_TYPE") {
            if let Ok(v) = val.parse() {
                self.dataset.element_type = v;
            }
        }
        if let Ok(val) = std::env::var("FBR_DATASET_LABEL_ELEMENT_TYPE") {
            if let Ok(v) = val.parse() {
                self.dataset.label_element_type = v;
            }
        }
        if let Ok(val) = std::env::var("FBR_DATASET_VERIFY_STREAM_LENGTHS") {
            if let Ok(v) = val.parse() {
                self.dataset.verify_stream_lengths = v;
            }
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.buffer_size == 0 {
            return Err(ReaderError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }

        if self.dataset.batch_size == 0 {
            return Err(ReaderError::config(
                "dataset.batch_size must be greater than 0",
            ));
        }

        if self.dataset.batch_size > i32::MAX as usize {
            return Err(ReaderError::config(format!(
                "dataset.batch_size must be at most {}",
                i32::MAX
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();

        assert_eq!(config.storage.base_path, PathBuf::from("."));
        assert_eq!(config.storage.buffer_size, 64 * 1024);
        assert!(config.storage.use_mmap);
        assert_eq!(config.storage.mmap_threshold, 1024 * 1024);

        assert_eq!(config.dataset.batch_size, 64);
        assert_eq!(config.dataset.element_type, ElementType::F32);
        assert_eq!(config.dataset.label_element_type, ElementType::F32);
        assert!(!config.dataset.verify_stream_lengths);
    }

    #[test]
    fn test_default_validates() {
        assert!(ReaderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_str_empty() {
        let config: ReaderConfig = "".parse().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_partial() {
        let toml = r#"
            [dataset]
            batch_size = 128
        "#;
        let config: ReaderConfig = toml.parse().unwrap();

        assert_eq!(config.dataset.batch_size, 128);
        // Other dataset fields should be defaults
        assert_eq!(config.dataset.element_type, ElementType::F32);
        // Other sections should be defaults
        assert_eq!(config.storage.buffer_size, 64 * 1024);
    }

    #[test]
    fn test_from_str_full() {
        let toml = r#"
            [storage]
            base_path = "/data/coco"
            buffer_size = 131072
            use_mmap = false
            mmap_threshold = 2097152

            [dataset]
            batch_size = 32
            element_type = "u8"
            label_element_type = "f64"
            verify_stream_lengths = true
        "#;

        let config: ReaderConfig = toml.parse().unwrap();

        assert_eq!(config.storage.base_path, PathBuf::from("/data/coco"));
        assert_eq!(config.storage.buffer_size, 131072);
        assert!(!config.storage.use_mmap);
        assert_eq!(config.storage.mmap_threshold, 2097152);

        assert_eq!(config.dataset.batch_size, 32);
        assert_eq!(config.dataset.element_type, ElementType::U8);
        assert_eq!(config.dataset.label_element_type, ElementType::F64);
        assert!(config.dataset.verify_stream_lengths);
    }

    #[test]
    fn test_from_str_unknown_element_type() {
        let toml = r#"
            [dataset]
            element_type = "complex128"
        "#;
        let result: std::result::Result<ReaderConfig, _> = toml.parse();
        assert!(matches!(result, Err(ReaderError::Config { .. })));
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result: std::result::Result<ReaderConfig, _> = "invalid = [".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [dataset]
            batch_size = 7
            "#
        )
        .unwrap();

        let config = ReaderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dataset.batch_size, 7);
    }

    #[test]
    fn test_from_file_not_found() {
        let result = ReaderConfig::from_file("/nonexistent/reader.toml");
        assert!(matches!(result, Err(ReaderError::Path { .. })));
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[dataset]\nbatch_size = 0").unwrap();

        let result = ReaderConfig::from_file(file.path());
        assert!(result.unwrap_err().to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_invalid_buffer_size() {
        let mut config = ReaderConfig::default();
        config.storage.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_batch_size() {
        let mut config = ReaderConfig::default();
        config.dataset.batch_size = 0;
        assert!(config.validate().is_err());

        config.dataset.batch_size = i32::MAX as usize + 1;
        assert!(config.validate().is_err());
    }

    // Helper to clear all FBR_ environment variables for test isolation
    fn clear_fbr_env_vars() {
        for (key, _) in std::env::vars() {
            if key.starts_with("FBR_") {
                std::env::remove_var(&key);
            }
        }
    }

    // Environment variable tests are combined into a single test to avoid
    // race conditions when tests run in parallel, since env vars are global state.
    #[test]
    fn test_env_overrides() {
        clear_fbr_env_vars();

        std::env::set_var("FBR_STORAGE_BASE_PATH", "/env/path");
        std::env::set_var("FBR_STORAGE_USE_MMAP", "false");
        std::env::set_var("FBR_DATASET_BATCH_SIZE", "256");
        std::env::set_var("FBR_DATASET_ELEMENT_TYPE", "u8");
        std::env::set_var("FBR_DATASET_VERIFY_STREAM_LENGTHS", "true");

        let config = ReaderConfig::default().with_env_overrides();

        assert_eq!(config.storage.base_path, PathBuf::from("/env/path"));
        assert!(!config.storage.use_mmap);
        assert_eq!(config.dataset.batch_size, 256);
        assert_eq!(config.dataset.element_type, ElementType::U8);
        assert!(config.dataset.verify_stream_lengths);

        clear_fbr_env_vars();

        // Invalid values should be ignored (keep defaults)
        std::env::set_var("FBR_DATASET_BATCH_SIZE", "not_a_number");
        std::env::set_var("FBR_DATASET_ELEMENT_TYPE", "bf17");

        let config = ReaderConfig::default().with_env_overrides();

        assert_eq!(config.dataset.batch_size, 64);
        assert_eq!(config.dataset.element_type, ElementType::F32);

        clear_fbr_env_vars();
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut original = ReaderConfig::default();
        original.dataset.element_type = ElementType::F16;
        let toml_str = toml::to_string(&original).unwrap();
        let parsed: ReaderConfig = toml_str.parse().unwrap();

        assert_eq!(original.storage.base_path, parsed.storage.base_path);
        assert_eq!(original.dataset.batch_size, parsed.dataset.batch_size);
        assert_eq!(parsed.dataset.element_type, ElementType::F16);
    }
}
