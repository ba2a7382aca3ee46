use crate::error::{DocumentLoadError, PersistenceError};
use crate::types::Document;
use std::fs;
use std::path::Path;

/// Seam to the document-model library that owns the container format.
///
/// The core never parses or writes the container itself; it only asks a
/// store for the in-memory tree and hands it back for persistence.
pub trait DocumentStore: Send + Sync {
    fn load(&self, path: &Path) -> Result<Document, DocumentLoadError>;
    fn save(&self, document: &Document, path: &Path) -> Result<(), PersistenceError>;
}

/// File-based store that keeps the document tree as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentStore;

impl JsonDocumentStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for JsonDocumentStore {
    fn load(&self, path: &Path) -> Result<Document, DocumentLoadError> {
        let json_str = fs::read_to_string(path).map_err(|source| DocumentLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json_str).map_err(|e| DocumentLoadError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn save(&self, document: &Document, path: &Path) -> Result<(), PersistenceError> {
        let json_str =
            serde_json::to_string_pretty(document).map_err(|e| PersistenceError::Serialize {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        fs::write(path, json_str).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Block, Paragraph, Section};

    #[test]
    fn test_json_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let document = Document {
            sections: vec![Section::default()],
            body: vec![Block::Paragraph(Paragraph::body("hello"))],
            styles: vec![],
        };

        let store = JsonDocumentStore::new();
        store.save(&document, &path).unwrap();
        assert_eq!(store.load(&path).unwrap(), document);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonDocumentStore
            .load(&dir.path().join("absent.json"))
            .unwrap_err();
        assert!(matches!(err, DocumentLoadError::Io { .. }));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonDocumentStore.load(&path).unwrap_err();
        assert!(matches!(err, DocumentLoadError::Malformed { .. }));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("doc.json");
        let err = JsonDocumentStore
            .save(&Document::default(), &path)
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }
}
