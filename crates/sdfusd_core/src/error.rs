//! The conversion error accumulator.
//!
//! Conversion never stops at the first problem: every operation returns the
//! records it produced and the caller decides what is fatal.

use std::fmt;

use sdfusd_sdf::SdfError;
use sdfusd_usd::StageError;
use thiserror::Error;

/// Category of a conversion problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsdErrorKind {
    /// A root or referenced document is missing or corrupt.
    DocumentOpen,
    /// A path, material, body or reference target was not found.
    ResolutionMiss,
    /// An expected API is not applied or an attribute has an unexpected type.
    SchemaMismatch,
    /// Two arcs claim the same composed path.
    DuplicateRegistration,
    /// Invalid dimensions, negative mass, unsupported types and the like.
    InvalidParameter,
}

impl UsdErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsdErrorKind::DocumentOpen => "document open",
            UsdErrorKind::ResolutionMiss => "resolution miss",
            UsdErrorKind::SchemaMismatch => "schema mismatch",
            UsdErrorKind::DuplicateRegistration => "duplicate registration",
            UsdErrorKind::InvalidParameter => "invalid parameter",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            UsdErrorKind::SchemaMismatch => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for UsdErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded conversion problem.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct UsdError {
    pub kind: UsdErrorKind,
    pub message: String,
}

impl UsdError {
    pub fn new(kind: UsdErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn document_open(message: impl Into<String>) -> Self {
        Self::new(UsdErrorKind::DocumentOpen, message)
    }

    pub fn resolution_miss(message: impl Into<String>) -> Self {
        Self::new(UsdErrorKind::ResolutionMiss, message)
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(UsdErrorKind::SchemaMismatch, message)
    }

    pub fn duplicate_registration(message: impl Into<String>) -> Self {
        Self::new(UsdErrorKind::DuplicateRegistration, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(UsdErrorKind::InvalidParameter, message)
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl From<StageError> for UsdError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Io { .. } | StageError::Parse { .. } => Self::document_open(err.to_string()),
            StageError::InvalidPath(_) => Self::invalid_parameter(err.to_string()),
            StageError::NoSuchPrim(_) => Self::resolution_miss(err.to_string()),
        }
    }
}

impl From<SdfError> for UsdError {
    fn from(err: SdfError) -> Self {
        match err {
            SdfError::Io(_) | SdfError::XmlParse(_) | SdfError::XmlWrite(_) => {
                Self::document_open(err.to_string())
            }
            _ => Self::invalid_parameter(err.to_string()),
        }
    }
}

/// Ordered sequence of conversion problems; empty means success.
pub type UsdErrors = Vec<UsdError>;

/// True when any record is an error rather than a warning.
pub fn has_errors(errors: &[UsdError]) -> bool {
    errors.iter().any(|e| e.severity() == Severity::Error)
}
