//! The destination side of an import.
//!
//! An [`Importer`] materializes the reconstructed tree. It receives one
//! [`NodeInfo`] and its ordinary properties per node when the node is
//! committed, and the same descriptor again when the node closes.

use std::error::Error;
use std::fmt;
use std::io;

use crate::name::{NameResolver, QName};
use crate::property::PropertyType;
use crate::value::{dispose_all, TextValue};

/// Identity of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: QName,
    /// Primary type, if the node declared one.
    pub type_name: Option<QName>,
    /// Mixin types in declaration order.
    pub mixin_names: Vec<QName>,
    /// Stable identifier (`jcr:uuid`), verbatim.
    pub identifier: Option<String>,
}

impl NodeInfo {
    pub fn new(name: QName) -> Self {
        NodeInfo {
            name,
            type_name: None,
            mixin_names: Vec::new(),
            identifier: None,
        }
    }
}

/// One ordinary property with its values in document order.
#[derive(Debug)]
pub struct PropInfo {
    pub name: QName,
    pub ty: PropertyType,
    pub values: Vec<TextValue>,
}

impl PropInfo {
    pub fn new(name: QName, ty: PropertyType, values: Vec<TextValue>) -> Self {
        PropInfo { name, ty, values }
    }

    /// Release every value, returning the first failure.
    pub fn dispose(self) -> io::Result<()> {
        let mut first = None;
        for value in self.values {
            if let Err(err) = value.dispose() {
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// Release the values of every property, logging failures.
pub(crate) fn dispose_properties(properties: Vec<PropInfo>) {
    dispose_all(properties.into_iter().flat_map(|prop| prop.values));
}

/// Failure reported by an importer.
#[derive(Debug)]
pub struct RepositoryError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        RepositoryError {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        RepositoryError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for RepositoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|err| err as &(dyn Error + 'static))
    }
}

/// Receives the reconstructed tree.
///
/// Calls arrive in document order: `start` once, then `start_node` /
/// `end_node` pairs nested like the node elements, then `end` once. A
/// node's `start_node` precedes those of its descendants and its `end_node`
/// follows theirs.
pub trait Importer {
    /// Called once before any node.
    fn start(&mut self) -> Result<(), RepositoryError>;

    /// Called once per node with its identity and ordinary properties.
    ///
    /// The property values are released as soon as this returns.
    fn start_node(
        &mut self,
        node: &NodeInfo,
        properties: &[PropInfo],
        resolver: &dyn NameResolver,
    ) -> Result<(), RepositoryError>;

    /// Called once per node after all its descendants have ended.
    fn end_node(&mut self, node: &NodeInfo) -> Result<(), RepositoryError>;

    /// Called once after the last node.
    fn end(&mut self) -> Result<(), RepositoryError>;
}

impl<I: Importer + ?Sized> Importer for &mut I {
    fn start(&mut self) -> Result<(), RepositoryError> {
        (**self).start()
    }

    fn start_node(
        &mut self,
        node: &NodeInfo,
        properties: &[PropInfo],
        resolver: &dyn NameResolver,
    ) -> Result<(), RepositoryError> {
        (**self).start_node(node, properties, resolver)
    }

    fn end_node(&mut self, node: &NodeInfo) -> Result<(), RepositoryError> {
        (**self).end_node(node)
    }

    fn end(&mut self) -> Result<(), RepositoryError> {
        (**self).end()
    }
}

impl<I: Importer + ?Sized> Importer for Box<I> {
    fn start(&mut self) -> Result<(), RepositoryError> {
        (**self).start()
    }

    fn start_node(
        &mut self,
        node: &NodeInfo,
        properties: &[PropInfo],
        resolver: &dyn NameResolver,
    ) -> Result<(), RepositoryError> {
        (**self).start_node(node, properties, resolver)
    }

    fn end_node(&mut self, node: &NodeInfo) -> Result<(), RepositoryError> {
        (**self).end_node(node)
    }

    fn end(&mut self) -> Result<(), RepositoryError> {
        (**self).end()
    }
}
