use crate::cache::RunCache;
use crate::error::{DocumentLoadError, PersistenceError};
use crate::storage::DocumentStore;
use crate::types::{Document, Paragraph, Section, Table};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Content width used until page geometry is known (A4 minus 2.54cm margins).
pub const DEFAULT_AVAILABLE_WIDTH_CM: f64 = 15.92;

/// Handle over one loaded document for the duration of one execution run.
///
/// Owns the document tree, the run-scoped cache and the derived available
/// content width. Not shared across runs.
pub struct DocumentContext {
    path: PathBuf,
    document: Document,
    cache: RunCache,
    available_width_cm: f64,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContext")
            .field("path", &self.path)
            .field("available_width_cm", &self.available_width_cm)
            .field("cached_keys", &self.cache.len())
            .finish()
    }
}

impl DocumentContext {
    /// Loads the document at `path` through `store`.
    pub fn open(path: &Path, store: Arc<dyn DocumentStore>) -> Result<Self, DocumentLoadError> {
        let document = store.load(path)?;
        debug!(path = %path.display(), "document loaded");
        Ok(Self::from_document(path, document, store))
    }

    /// Wraps an already-loaded tree.
    pub fn from_document(path: &Path, document: Document, store: Arc<dyn DocumentStore>) -> Self {
        let mut context = Self {
            path: path.to_path_buf(),
            document,
            cache: RunCache::new(),
            available_width_cm: DEFAULT_AVAILABLE_WIDTH_CM,
            store,
        };
        context.refresh_available_width();
        context
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.document.paragraphs()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.document.tables()
    }

    pub fn sections(&self) -> &[Section] {
        &self.document.sections
    }

    pub fn set_cache(&mut self, key: &str, value: impl Into<Value>) {
        self.cache.set(key, value);
    }

    pub fn get_cache(&self, key: &str, default: Value) -> Value {
        self.cache.get_or(key, default)
    }

    pub fn cache(&self) -> &RunCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Page width minus left/right margins of the first section, in cm.
    pub fn available_width_cm(&self) -> f64 {
        self.available_width_cm
    }

    /// Recomputes the available width from the current page geometry.
    /// Called by rules that change section geometry.
    pub fn refresh_available_width(&mut self) -> f64 {
        if let Some(width) = self.document.available_width_cm() {
            self.available_width_cm = width;
        }
        self.available_width_cm
    }

    /// Persists the document to `path`, or to the path it was opened from.
    /// Returns the path written.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, PersistenceError> {
        let target = path.unwrap_or(&self.path);
        self.store.save(&self.document, target)?;
        debug!(path = %target.display(), "document saved");
        Ok(target.to_path_buf())
    }
}
