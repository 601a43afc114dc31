//! Data source schema.

use std::collections::BTreeMap;

use serde::Serialize;

/// Free-form metadata attached to a source.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Shape description of a data source.
///
/// Text sources have no element type and an unbounded length, so only the
/// partition count and metadata carry information.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Schema {
    /// Element type. Always `None` for text.
    pub dtype: Option<String>,
    /// One unbounded dimension.
    pub shape: Vec<Option<usize>>,
    /// Number of partitions.
    pub npartitions: usize,
    /// Metadata supplied at construction.
    pub extra_metadata: Metadata,
}

impl Schema {
    /// Schema with no dtype and a single unbounded dimension.
    #[must_use]
    pub fn unbounded(npartitions: usize, extra_metadata: Metadata) -> Self {
        Self {
            dtype: None,
            shape: vec![None],
            npartitions,
            extra_metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unbounded_schema_serializes() {
        let mut metadata = Metadata::new();
        metadata.insert("owner".to_owned(), json!("docs"));

        let schema = Schema::unbounded(3, metadata);

        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "dtype": null,
                "shape": [null],
                "npartitions": 3,
                "extra_metadata": {"owner": "docs"}
            })
        );
    }
}
