//! Error types for system-view import.
//!
//! Every error terminates the import in progress. The handler disposes all
//! value buffers it still owns before returning the error to the caller, and
//! refuses any further event with [`ImportError::Aborted`].

use std::io;

use thiserror::Error;

use crate::importer::RepositoryError;
use crate::name::NameError;

/// The event stream does not follow the system-view vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Element outside the system-view namespace.
    #[error("invalid namespace for element in system view document: {}", found.as_deref().unwrap_or("<none>"))]
    WrongNamespace { found: Option<String> },

    /// Element other than `node`, `property` or `value`.
    #[error("unexpected element in system view document: {name}")]
    UnexpectedElement { name: String },

    /// Mandatory attribute absent.
    #[error("missing mandatory sv:{attribute} attribute of element sv:{element}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// `sv:type` token not in the type table.
    #[error("unknown property type: {token}")]
    UnknownPropertyType { token: String },

    /// Element nested where the grammar does not allow it.
    #[error("sv:{element} element outside of sv:{parent}")]
    Misplaced {
        element: &'static str,
        parent: &'static str,
    },

    /// Element nested inside one that cannot contain it.
    #[error("sv:{element} not allowed inside sv:{parent}")]
    UnexpectedNesting {
        element: &'static str,
        parent: &'static str,
    },

    /// A property appeared after the node already received a child node.
    #[error("sv:property {property} follows a child node of {node}")]
    PropertyAfterChild { node: String, property: String },

    /// Reserved identity property carried no value.
    #[error("missing value for property {property}")]
    MissingValue { property: String },

    /// End event with no matching start.
    #[error("end of sv:{element} without matching start")]
    UnbalancedEnd { element: &'static str },

    /// Document ended while nodes were still open.
    #[error("document ended with {open} unclosed sv:node element(s)")]
    UnclosedNodes { open: usize },
}

/// Failure of an import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A prefixed name could not be resolved.
    #[error("illegal {role}: {raw}")]
    Name {
        role: &'static str,
        raw: String,
        #[source]
        source: NameError,
    },

    /// Spill storage failed.
    #[error("error while {action} property value")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    /// Propagated unchanged from the importer.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The XML tokenizer failed.
    #[cfg(feature = "xml")]
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Character data or a name was not valid UTF-8.
    #[cfg(feature = "xml")]
    #[error("invalid UTF-8 in XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// An event arrived after the import had already failed.
    #[error("import aborted by an earlier error")]
    Aborted,
}

impl ImportError {
    pub(crate) fn name(role: &'static str, raw: &str, source: NameError) -> Self {
        ImportError::Name {
            role,
            raw: raw.to_owned(),
            source,
        }
    }

    pub(crate) fn io(action: &'static str, source: io::Error) -> Self {
        ImportError::Io { action, source }
    }

    /// True for errors raised by the vocabulary checks.
    pub fn is_format(&self) -> bool {
        matches!(self, ImportError::Format(_))
    }
}
