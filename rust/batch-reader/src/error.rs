// rust/batch-reader/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {

    #[error("Cannot open '{path}': {message}")]
    Path {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Malformed {stream} stream: {message}")]
    Format {
        stream: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Short read on {stream} stream: {message}")]
    Io {
        stream: &'static str,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Label stream declares {labels} records but example stream declares {examples}")]
    Consistency {
        examples: i32,
        labels: i32,
    },

    #[error("Reader is exhausted: all {n_examples} examples have been read")]
    Usage {
        n_examples: i32,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

pub type Result<T> = std::result::Result<T, ReaderError>;

// Convenience constructors
impl ReaderError {

    pub fn path_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Path {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn format(stream: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            stream,
            message: message.into(),
            source: None,
        }
    }

    pub fn format_with_source(
        stream: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Format {
            stream,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io(stream: &'static str, message: impl Into<String>) -> Self {
        Self::Io {
            stream,
            message: message.into(),
            source: None,
        }
    }

    pub fn io_with_source(
        stream: &'static str,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            stream,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn consistency(examples: i32, labels: i32) -> Self {
        Self::Consistency { examples, labels }
    }

    pub fn usage(n_examples: i32) -> Self {
        Self::Usage { n_examples }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }
}
