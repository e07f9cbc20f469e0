//! Document types for knowledge-base content.
//!
//! A [`KnowledgeTable`] is the tabular input interface: ordered rows with
//! named columns. Each row becomes one [`Document`], the retrievable unit of
//! knowledge-base content, carrying the formatted text blob, the original
//! record as metadata, and lazily populated embedding/topic state.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Column name supplying stable document ids when present.
pub const ID_COLUMN: &str = "id";

/// Tabular knowledge data: ordered rows with named columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeTable {
    columns: Vec<String>,
    rows: Vec<HashMap<String, Value>>,
}

impl KnowledgeTable {
    /// Create a table, checking that every row has every column.
    pub fn new(columns: Vec<String>, rows: Vec<HashMap<String, Value>>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::configuration("a knowledge table needs at least one column"));
        }
        for (i, row) in rows.iter().enumerate() {
            for column in &columns {
                if !row.contains_key(column) {
                    return Err(Error::configuration(format!(
                        "row {i} is missing column '{column}'"
                    )));
                }
            }
        }
        Ok(Self { columns, rows })
    }

    /// Single-column table from plain text snippets.
    pub fn from_texts(texts: impl IntoIterator<Item = String>) -> Self {
        let rows = texts
            .into_iter()
            .map(|text| HashMap::from([("text".to_string(), Value::String(text))]))
            .collect();
        Self {
            columns: vec!["text".to_string()],
            rows,
        }
    }

    /// Column names, in order
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, in order
    #[must_use]
    pub fn rows(&self) -> &[HashMap<String, Value>] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One retrievable unit of knowledge-base content.
///
/// `content` is immutable after construction. The embedding and topic id
/// start unset and are populated exactly once by the owning knowledge
/// base's lazy subsystems.
#[derive(Debug)]
pub struct Document {
    id: i64,
    content: String,
    metadata: HashMap<String, Value>,
    embedding: OnceLock<Vec<f32>>,
    topic_id: OnceLock<i64>,
}

impl Document {
    /// Build a document from one table row.
    ///
    /// `features` are the columns folded into the content blob. A single
    /// feature is used verbatim; several are rendered as `"feature: value"`
    /// lines. The `id` column, when present, supplies the document id and is
    /// excluded from content and metadata; otherwise `position` is used.
    pub fn from_record(
        mut record: HashMap<String, Value>,
        features: &[String],
        position: usize,
    ) -> Result<Self> {
        let id = match record.remove(ID_COLUMN) {
            Some(value) => value.as_i64().ok_or_else(|| {
                Error::configuration(format!("document id must be an integer, got {value}"))
            })?,
            None => position as i64,
        };

        let content = if features.len() == 1 {
            render_value(record.get(&features[0]).unwrap_or(&Value::Null))
        } else {
            features
                .iter()
                .map(|feature| {
                    let value = record.get(feature).unwrap_or(&Value::Null);
                    format!("{feature}: {}", render_value(value))
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(Self {
            id,
            content,
            metadata: record,
            embedding: OnceLock::new(),
            topic_id: OnceLock::new(),
        })
    }

    /// Stable document id, unique within its knowledge base
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// The formatted text blob
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Original record fields (without the id column)
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// The embedding vector, once computed
    #[must_use]
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.get().map(Vec::as_slice)
    }

    /// The topic id, once clustering has run
    #[must_use]
    pub fn topic_id(&self) -> Option<i64> {
        self.topic_id.get().copied()
    }

    pub(crate) fn set_embedding(&self, embedding: Vec<f32>) {
        let _ = self.embedding.set(embedding);
    }

    pub(crate) fn set_topic_id(&self, topic_id: i64) {
        let _ = self.topic_id.set(topic_id);
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn faq_row(q: &str, a: &str) -> HashMap<String, Value> {
        HashMap::from([
            ("Q".to_string(), json!(q)),
            ("A".to_string(), json!(a)),
        ])
    }

    #[test]
    fn test_table_validates_columns() {
        let rows = vec![faq_row("q1", "a1")];
        assert!(KnowledgeTable::new(vec!["Q".into(), "A".into()], rows.clone()).is_ok());
        assert!(KnowledgeTable::new(vec!["Q".into(), "missing".into()], rows).is_err());
        assert!(KnowledgeTable::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_single_feature_content_is_verbatim() {
        let row = HashMap::from([("text".to_string(), json!("the sole field"))]);
        let doc = Document::from_record(row, &["text".to_string()], 0).unwrap();
        assert_eq!(doc.content(), "the sole field");
        assert_eq!(doc.id(), 0);
    }

    #[test]
    fn test_multi_feature_content_is_labeled_lines() {
        let doc =
            Document::from_record(faq_row("why?", "because"), &["Q".into(), "A".into()], 3)
                .unwrap();
        assert_eq!(doc.content(), "Q: why?\nA: because");
        assert_eq!(doc.id(), 3);
    }

    #[test]
    fn test_id_column_overrides_position() {
        let mut row = faq_row("q", "a");
        row.insert(ID_COLUMN.to_string(), json!(42));
        let doc = Document::from_record(row, &["Q".into(), "A".into()], 0).unwrap();
        assert_eq!(doc.id(), 42);
        // The id column never leaks into metadata.
        assert!(!doc.metadata().contains_key(ID_COLUMN));
    }

    #[test]
    fn test_non_integer_id_rejected() {
        let mut row = faq_row("q", "a");
        row.insert(ID_COLUMN.to_string(), json!("abc"));
        assert!(Document::from_record(row, &["Q".into(), "A".into()], 0).is_err());
    }

    #[test]
    fn test_non_string_values_render() {
        let row = HashMap::from([
            ("name".to_string(), json!("widget")),
            ("price".to_string(), json!(9.5)),
        ]);
        let doc =
            Document::from_record(row, &["name".to_string(), "price".to_string()], 0).unwrap();
        assert_eq!(doc.content(), "name: widget\nprice: 9.5");
    }

    #[test]
    fn test_lazy_fields_start_unset() {
        let doc = Document::from_record(faq_row("q", "a"), &["Q".into(), "A".into()], 0).unwrap();
        assert!(doc.embedding().is_none());
        assert!(doc.topic_id().is_none());

        doc.set_embedding(vec![1.0, 2.0]);
        doc.set_topic_id(0);
        assert_eq!(doc.embedding(), Some([1.0, 2.0].as_slice()));
        assert_eq!(doc.topic_id(), Some(0));

        // Second writes are ignored: the fields are populated exactly once.
        doc.set_topic_id(5);
        assert_eq!(doc.topic_id(), Some(0));
    }
}
