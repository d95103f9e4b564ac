// rust/batch-reader/src/dataset/batch.rs

use super::format::RecordLayout;

/// A batch of consecutive examples produced by one `get_next_batch` call.
///
/// A batch owns all of its buffers; it holds no reference back into the
/// reader that produced it and may outlive it.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    examples: Vec<u8>,
    ids: Vec<i32>,
    labels: Option<Vec<u8>>,
    len: usize,
    shape: [usize; 3],
    example_layout: RecordLayout,
    label_layout: Option<RecordLayout>,
    first_index: usize,
    batch_index: u64,
}

/// Owned buffers of a batch, for handing off to a compute engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchParts {
    pub examples: Vec<u8>,
    pub ids: Vec<i32>,
    pub labels: Option<Vec<u8>>,
}

impl Batch {
    pub(crate) fn new(
        examples: Vec<u8>,
        ids: Vec<i32>,
        shape: [usize; 3],
        example_layout: RecordLayout,
        first_index: usize,
        batch_index: u64,
    ) -> Self {
        debug_assert_eq!(examples.len(), ids.len() * example_layout.record_bytes);
        Self {
            len: ids.len(),
            examples,
            ids,
            labels: None,
            shape,
            example_layout,
            label_layout: None,
            first_index,
            batch_index,
        }
    }

    pub(crate) fn with_labels(mut self, labels: Vec<u8>, label_layout: RecordLayout) -> Self {
        debug_assert_eq!(labels.len(), self.len * label_layout.record_bytes);
        self.labels = Some(labels);
        self.label_layout = Some(label_layout);
        self
    }

    /// Number of examples in the batch.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw example payload, `len() * example_bytes()` bytes.
    pub fn examples(&self) -> &[u8] {
        &self.examples
    }

    /// Payload of the `index`-th example in the batch.
    pub fn example(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let size = self.example_layout.record_bytes;
        Some(&self.examples[index * size..(index + 1) * size])
    }

    /// Identifiers, one per example.
    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    /// Raw label payload; `None` for batches from an unlabeled reader.
    pub fn labels(&self) -> Option<&[u8]> {
        self.labels.as_deref()
    }

    /// Label record of the `index`-th example in the batch.
    pub fn label(&self, index: usize) -> Option<&[u8]> {
        let (labels, layout) = (self.labels.as_ref()?, self.label_layout?);
        if index >= self.len {
            return None;
        }
        let size = layout.record_bytes;
        Some(&labels[index * size..(index + 1) * size])
    }

    /// Number of label records carried (0 when unlabeled).
    pub fn label_count(&self) -> usize {
        match (&self.labels, self.label_layout) {
            (Some(labels), Some(layout)) => labels.len() / layout.record_bytes,
            _ => 0,
        }
    }

    pub fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    /// Per-example `(H, W, C)`.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn example_layout(&self) -> RecordLayout {
        self.example_layout
    }

    pub fn label_layout(&self) -> Option<RecordLayout> {
        self.label_layout
    }

    /// Bytes per example.
    pub fn example_bytes(&self) -> usize {
        self.example_layout.record_bytes
    }

    /// Dataset position of the first example in this batch.
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    /// Zero-based sequence number of this batch within its reader.
    pub fn batch_index(&self) -> u64 {
        self.batch_index
    }

    /// Consumes the batch and returns its buffers.
    pub fn into_parts(self) -> BatchParts {
        BatchParts {
            examples: self.examples,
            ids: self.ids,
            labels: self.labels,
        }
    }
}
