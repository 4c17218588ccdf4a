//! Error types for SDF parsing and writing.

use thiserror::Error;

/// Errors that can occur while reading or writing SDF documents.
#[derive(Debug, Error)]
pub enum SdfError {
    /// IO error while reading a document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// XML serialization failure.
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// Missing required element.
    #[error("missing required element: {element} in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    /// Missing required attribute.
    #[error("missing required attribute: {attribute} on {element}")]
    MissingAttribute {
        attribute: &'static str,
        element: String,
    },

    /// Element text that does not parse as the expected type.
    #[error("invalid value for {element}: {message}")]
    InvalidValue { element: String, message: String },

    /// Unknown joint type.
    #[error("unknown joint type: {0}")]
    UnknownJointType(String),
}

impl SdfError {
    pub fn missing_element(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }

    pub fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    pub fn invalid_value(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            element: element.into(),
            message: message.into(),
        }
    }
}

/// Result type for SDF operations.
pub type SdfResult<T> = std::result::Result<T, SdfError>;
