// Docnorm Core Library
//
// Rule engine that normalizes the formatting of a parsed document tree:
// parameter schemas, the per-run document context, numbering/bullet
// classification, table width layout and the built-in rules.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod layout;
pub mod rules;
pub mod schema;
pub mod storage;
pub mod types;

// Re-export main types and functions for easy use
pub use config::PresetCatalog;
pub use context::DocumentContext;
pub use error::{
    ApplyError, DocumentLoadError, EngineError, InvocationError, PersistenceError, ValidationError,
};
pub use rules::{Rule, RuleEngine, RuleState};
pub use schema::{ParamMap, ParamSpec, RuleConfigSchema};
pub use storage::{DocumentStore, JsonDocumentStore};
pub use types::*;
