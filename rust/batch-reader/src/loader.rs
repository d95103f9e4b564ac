// rust/batch-reader/src/loader.rs

//! Configured entry point for opening and writing datasets.
//!
//! [`Loader`] owns a validated [`ReaderConfig`] and the storage backend built
//! from it, so the batch size, element types and base path are decided once
//! and every reader it opens shares them.
//!
//! # Example
//!
//! ```no_run
//! use batch_reader::{BatchSource, Loader};
//!
//! let loader = Loader::from_config_file("reader.toml")?;
//! let mut reader = loader.open_labeled("imgdata.dat", "nmdata.dat", "lbldata.dat")?;
//! for batch in &mut reader {
//!     let batch = batch?;
//!     println!("batch {} holds {} examples", batch.batch_index(), batch.len());
//! }
//! # Ok::<(), batch_reader::ReaderError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::config::ReaderConfig;
use crate::dataset::{BatchSource, DatasetWriter, ExampleHeader, LabeledReader, Reader};
use crate::error::Result;
use crate::storage::{LocalStorage, StorageBackend};

/// Opens readers and writers against one storage backend and configuration.
pub struct Loader {
    config: ReaderConfig,
    storage: Arc<dyn StorageBackend>,
}

impl Loader {
    /// Creates a loader with the default configuration.
    pub fn new() -> Result<Self> {
        Self::from_config(ReaderConfig::default())
    }

    /// Creates a loader from a TOML configuration file.
    ///
    /// Environment variable overrides are applied after loading the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = ReaderConfig::from_file(path)?.with_env_overrides();
        Self::from_config(config)
    }

    /// Creates a loader backed by local storage rooted at
    /// `config.storage.base_path`.
    pub fn from_config(config: ReaderConfig) -> Result<Self> {
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config.storage));
        Self::with_storage(config, storage)
    }

    /// Creates a loader over a caller-supplied storage backend.
    pub fn with_storage(config: ReaderConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            base_path = %config.storage.base_path.display(),
            batch_size = config.dataset.batch_size,
            element_type = %config.dataset.element_type,
            "created loader"
        );
        Ok(Self { config, storage })
    }

    /// Opens an unlabeled dataset with the configured batch size.
    pub fn open(&self, example_path: impl AsRef<Path>, id_path: impl AsRef<Path>) -> Result<Reader> {
        self.open_with_batch_size(example_path, id_path, self.config.dataset.batch_size)
    }

    /// Opens an unlabeled dataset with an explicit batch size.
    pub fn open_with_batch_size(
        &self,
        example_path: impl AsRef<Path>,
        id_path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<Reader> {
        Reader::open(
            self.storage.as_ref(),
            example_path.as_ref(),
            id_path.as_ref(),
            batch_size,
            &self.config.dataset,
        )
    }

    /// Opens a labeled dataset with the configured batch size.
    pub fn open_labeled(
        &self,
        example_path: impl AsRef<Path>,
        id_path: impl AsRef<Path>,
        label_path: impl AsRef<Path>,
    ) -> Result<LabeledReader> {
        LabeledReader::open(
            self.storage.as_ref(),
            example_path.as_ref(),
            id_path.as_ref(),
            label_path.as_ref(),
            self.config.dataset.batch_size,
            &self.config.dataset,
        )
    }

    /// Opens whichever reader fits: labeled when `label_path` is given.
    pub fn open_source(
        &self,
        example_path: impl AsRef<Path>,
        id_path: impl AsRef<Path>,
        label_path: Option<&Path>,
    ) -> Result<Box<dyn BatchSource>> {
        Ok(match label_path {
            Some(labels) => Box::new(self.open_labeled(example_path, id_path, labels)?),
            None => Box::new(self.open(example_path, id_path)?),
        })
    }

    /// Creates a dataset writer using the configured example element type.
    ///
    /// When `labels` names a path and label width, a label file is created
    /// there with the configured label element type.
    pub fn create_writer(
        &self,
        example_path: impl AsRef<Path>,
        id_path: impl AsRef<Path>,
        header: ExampleHeader,
        labels: Option<(&Path, i32)>,
    ) -> Result<DatasetWriter> {
        let writer = DatasetWriter::create(
            self.storage.as_ref(),
            example_path.as_ref(),
            id_path.as_ref(),
            header,
            self.config.dataset.element_type,
        )?;
        match labels {
            Some((label_path, label_width)) => writer.with_labels(
                self.storage.as_ref(),
                label_path,
                label_width,
                self.config.dataset.label_element_type,
            ),
            None => Ok(writer),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("base_path", &self.config.storage.base_path)
            .field("batch_size", &self.config.dataset.batch_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ElementType;
    use crate::error::ReaderError;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_loader(batch_size: usize) -> (Loader, TempDir) {
        let temp_dir = TempDir::new().unwrap();

        let mut config = ReaderConfig::default();
        config.storage.base_path = temp_dir.path().to_path_buf();
        config.dataset.batch_size = batch_size;

        let loader = Loader::from_config(config).unwrap();
        (loader, temp_dir)
    }

    fn write_small_dataset(loader: &Loader, n: i32, labeled: bool) {
        let header = ExampleHeader::new(n, 1, 2, 1);
        let labels = labeled.then_some((Path::new("labels.dat"), 2));
        let mut writer = loader
            .create_writer("examples.dat", "ids.dat", header, labels)
            .unwrap();
        for i in 0..n {
            let example: Vec<u8> = [i as f32, -(i as f32)]
                .iter()
                .flat_map(|v| v.to_le_bytes())
                .collect();
            if labeled {
                let label: Vec<u8> = [1.0f32, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect();
                writer.write_labeled(i * 10, &example, &label).unwrap();
            } else {
                writer.write_example(i * 10, &example).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_loader_from_config() {
        let (loader, _temp) = create_test_loader(4);
        assert_eq!(loader.config().dataset.batch_size, 4);
        assert!(loader.config().storage.buffer_size > 0);
    }

    #[test]
    fn test_loader_rejects_invalid_config() {
        let mut config = ReaderConfig::default();
        config.dataset.batch_size = 0;
        assert!(matches!(
            Loader::from_config(config),
            Err(ReaderError::Config { .. })
        ));
    }

    #[test]
    fn test_open_uses_configured_batch_size() {
        let (loader, _temp) = create_test_loader(2);
        write_small_dataset(&loader, 5, false);

        let reader = loader.open("examples.dat", "ids.dat").unwrap();
        let sizes: Vec<usize> = reader.map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_open_with_batch_size_overrides_config() {
        let (loader, _temp) = create_test_loader(2);
        write_small_dataset(&loader, 5, false);

        let mut reader = loader
            .open_with_batch_size("examples.dat", "ids.dat", 10)
            .unwrap();
        let batch = reader.get_next_batch().unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.ids(), &[0, 10, 20, 30, 40]);
        assert!(reader.is_finished());
    }

    #[test]
    fn test_open_labeled_round_trip() {
        let (loader, _temp) = create_test_loader(3);
        write_small_dataset(&loader, 4, true);

        let mut reader = loader
            .open_labeled("examples.dat", "ids.dat", "labels.dat")
            .unwrap();
        assert_eq!(reader.label_header().label_width, 2);
        let batch = reader.get_next_batch().unwrap();
        assert_eq!(batch.label_count(), 3);
        assert_eq!(batch.example_bytes(), 8);
    }

    #[test]
    fn test_open_source_picks_reader_kind() {
        let (loader, _temp) = create_test_loader(8);
        write_small_dataset(&loader, 3, true);

        let mut labeled = loader
            .open_source("examples.dat", "ids.dat", Some(Path::new("labels.dat")))
            .unwrap();
        assert!(labeled.get_next_batch().unwrap().has_labels());

        let mut plain = loader.open_source("examples.dat", "ids.dat", None).unwrap();
        assert!(!plain.get_next_batch().unwrap().has_labels());
        assert!(plain.is_finished());
    }

    #[test]
    fn test_missing_file_relative_to_base_path() {
        let (loader, _temp) = create_test_loader(8);
        assert!(matches!(
            loader.open("missing.dat", "ids.dat"),
            Err(ReaderError::Path { .. })
        ));
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = TempDir::new().unwrap();

        let config_content = format!(
            r#"
            [storage]
            base_path = "{}"
            use_mmap = false

            [dataset]
            batch_size = 3
            element_type = "u8"
            "#,
            temp_dir.path().display()
        );

        let config_path = temp_dir.path().join("reader.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        // Env overrides are covered by the config tests, which mutate FBR_ vars
        let loader = Loader::from_config(ReaderConfig::from_file(&config_path).unwrap()).unwrap();

        assert_eq!(loader.config().dataset.batch_size, 3);
        assert_eq!(loader.config().dataset.element_type, ElementType::U8);
        assert!(!loader.config().storage.use_mmap);
    }

    #[test]
    fn test_writer_paths_resolve_against_base_path() {
        let (loader, temp) = create_test_loader(8);
        write_small_dataset(&loader, 1, false);

        assert!(temp.path().join("examples.dat").is_file());
        assert!(temp.path().join("ids.dat").is_file());
    }
}
