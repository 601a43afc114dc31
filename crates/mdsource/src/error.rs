//! Source error types.

use mdsource_render::RenderError;
use mdsource_storage::StorageError;

/// Error from a data source operation.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Resolution, open, read or decode failure from the storage backend.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Rendering failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Partition index outside `[0, npartitions)`.
    #[error("partition index {index} out of range for {npartitions} partitions")]
    PartitionOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of partitions.
        npartitions: usize,
    },
}
