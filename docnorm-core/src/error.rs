use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The document could not be opened. Fatal to a run: no rule executes.
#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("failed to read document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Saving the document failed. Downgrades the run status but keeps the results.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize document for {path}: {message}")]
    Serialize { path: PathBuf, message: String },
}

/// Raised from inside a rule's `apply`.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("missing parameter `{0}`")]
    MissingParam(String),
    #[error("parameter `{name}` expected {expected}, found {found}")]
    InvalidParam {
        name: String,
        expected: &'static str,
        found: String,
    },
    #[error("{0}")]
    Failed(String),
}

/// Failure of one invocation inside a run. Always captured into the report.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("unknown rule id: {0}")]
    UnknownRule(String),
    #[error("rule {rule_id} failed: {source}")]
    Apply {
        rule_id: String,
        #[source]
        source: ApplyError,
    },
}

/// Errors surfaced by the engine API itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown rule id: {0}")]
    UnknownRule(String),
    #[error("rule id `{0}` is registered more than once")]
    DuplicateRule(String),
    #[error("registration `{registered}` constructed a rule with id `{constructed}`")]
    RegistrationMismatch {
        registered: String,
        constructed: String,
    },
    #[error(transparent)]
    Load(#[from] DocumentLoadError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    Required,
    BelowMinimum { value: f64, min: f64 },
    AboveMaximum { value: f64, max: f64 },
    NotAChoice { value: String, choices: Vec<String> },
    WrongType { expected: &'static str },
}

/// One parameter-level validation failure. Produced only by explicit
/// validation calls; the caller decides whether to proceed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub param: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(param: &str, kind: ValidationErrorKind) -> Self {
        Self {
            param: param.to_string(),
            kind,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::Required => write!(f, "{}: value is required", self.param),
            ValidationErrorKind::BelowMinimum { value, min } => {
                write!(f, "{}: {value} is below the minimum {min}", self.param)
            }
            ValidationErrorKind::AboveMaximum { value, max } => {
                write!(f, "{}: {value} is above the maximum {max}", self.param)
            }
            ValidationErrorKind::NotAChoice { value, choices } => write!(
                f,
                "{}: `{value}` is not one of [{}]",
                self.param,
                choices.join(", ")
            ),
            ValidationErrorKind::WrongType { expected } => {
                write!(f, "{}: expected {expected}", self.param)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl serde::Serialize for ValidationError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
