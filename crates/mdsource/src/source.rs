//! The data source capability contract.

use crate::error::SourceError;
use crate::schema::{Metadata, Schema};

/// A partitioned data source.
///
/// Sources resolve their partitions lazily: the first call to any of
/// [`schema`](Self::schema), [`partition`](Self::partition) or
/// [`read`](Self::read) performs resolution, and later calls reuse it until
/// [`close`](Self::close).
pub trait DataSource {
    /// Value produced for a single partition.
    type Partition;
    /// Value produced by reading the whole source.
    type Output;

    /// Driver name used in catalogs.
    const NAME: &'static str;
    /// Driver version.
    const VERSION: &'static str;
    /// Container kind of the produced values.
    const CONTAINER: &'static str;
    /// Whether individual partitions can be read.
    const PARTITION_ACCESS: bool;

    /// Resolve (once) and describe the source.
    fn schema(&self) -> Result<Schema, SourceError>;

    /// Read one partition by zero-based index.
    fn partition(&self, index: usize) -> Result<Self::Partition, SourceError>;

    /// Read the whole source.
    fn read(&self) -> Result<Self::Output, SourceError>;

    /// Metadata supplied at construction.
    fn metadata(&self) -> &Metadata;

    /// Forget resolved state; the next access resolves again.
    fn close(&mut self);

    /// Number of partitions, resolving if needed.
    fn npartitions(&self) -> Result<usize, SourceError> {
        Ok(self.schema()?.npartitions)
    }
}
