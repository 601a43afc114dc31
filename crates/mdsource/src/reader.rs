//! Whole-file text reads.

use mdsource_storage::OpenFile;
use tracing::debug;

use crate::error::SourceError;

/// Read one file's entire content as text.
///
/// Opens the file, reads it fully and releases the handle before decoding,
/// on every path including read failures. Holds no shared state, so it can be
/// mapped over files from any number of threads.
///
/// # Errors
///
/// Returns [`SourceError::Storage`] for open, read or decode failures.
pub fn read_file(file: &OpenFile) -> Result<String, SourceError> {
    let text = file.read_text()?;
    debug!(location = file.location(), bytes = text.len(), "read file");
    Ok(text)
}
