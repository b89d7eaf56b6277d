//! Streaming system-view import.
//!
//! Rebuilds a content tree (named nodes carrying typed, possibly multi-valued
//! properties) from the structural events of a JCR system-view document,
//! without holding the document in memory.
//!
//! # Architecture
//!
//! - **handler.rs** - Event dispatcher, vocabulary and namespace checks
//! - **frame.rs** - Frame stack and deferred node commit
//! - **value.rs** - Value buffers (inline or spilled to a temp file), typed values
//! - **importer.rs** - The destination contract
//! - **name.rs** - Qualified names and prefix resolution
//! - **xml.rs** - `quick-xml` driver (feature `xml`)
//!
//! A node reaches the [`Importer`] once its property list is complete: when
//! its first child node starts, or when it ends. Identity properties
//! (`jcr:primaryType`, `jcr:mixinTypes`, `jcr:uuid`) may therefore appear
//! anywhere among the node's own properties.

pub mod config;
pub mod error;
pub mod event;
mod frame;
pub mod handler;
pub mod importer;
pub mod name;
pub mod property;
pub mod value;
#[cfg(feature = "xml")]
pub mod xml;

pub use config::ImportConfig;
pub use error::{FormatError, ImportError};
pub use event::{Attribute, Event};
pub use handler::ImportHandler;
pub use importer::{Importer, NodeInfo, PropInfo, RepositoryError};
pub use name::{NameError, NameResolver, NamespaceRegistry, NamespaceScopes, QName, ScopedResolver};
pub use property::PropertyType;
pub use value::{TextValue, Value, ValueBuffer, ValueError};
#[cfg(feature = "xml")]
pub use xml::{import_reader, import_str};
