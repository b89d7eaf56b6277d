//! Frame stack and deferred commit.
//!
//! One frame per open `sv:node`. A frame starts `Open`, collecting identity
//! and properties in document order. It is committed (handed to
//! [`Importer::start_node`]) when its first child node starts or when it
//! ends, whichever comes first. Only then is its property list known to be
//! complete, so the reserved identity properties may appear anywhere among
//! the node's own properties. After commit the frame keeps just the
//! descriptor it needs for [`Importer::end_node`].
//!
//! # Buffer ownership
//!
//! ```text
//! value start ──▶ ValueBuffer (open slot)
//! value end   ──▶ TextValue in the pending property
//! property end ─┬▶ reserved: read, then disposed at once
//!               └▶ ordinary: PropInfo in the open frame, disposed at commit
//! ```
//!
//! Whatever is still owned when the import fails is released by
//! [`FrameStack::release`], which also runs on drop.

use tracing::{debug, trace, warn};

use crate::config::ImportConfig;
use crate::error::{FormatError, ImportError};
use crate::importer::{dispose_properties, Importer, NodeInfo, PropInfo};
use crate::name::{NameResolver, QName};
use crate::property::{PropertyType, Reserved};
use crate::value::{dispose_all, TextValue, ValueBuffer};

// ============================================================================
// Frames
// ============================================================================

/// In-progress state of one node.
#[derive(Debug)]
enum Frame {
    /// Still collecting; identity may change.
    Open(PendingNode),
    /// Handed to the importer; identity is fixed.
    Started(NodeInfo),
}

#[derive(Debug)]
struct PendingNode {
    info: NodeInfo,
    properties: Vec<PropInfo>,
}

impl Frame {
    fn new(name: QName) -> Self {
        Frame::Open(PendingNode {
            info: NodeInfo::new(name),
            properties: Vec::new(),
        })
    }

    /// Hand the node to the importer unless that already happened.
    fn commit(
        &mut self,
        importer: &mut dyn Importer,
        resolver: &dyn NameResolver,
    ) -> Result<(), ImportError> {
        let (info, properties) = match self {
            Frame::Open(pending) => (pending.info.clone(), std::mem::take(&mut pending.properties)),
            Frame::Started(_) => return Ok(()),
        };
        debug!(node = %info.name, properties = properties.len(), "start node");
        let result = importer.start_node(&info, &properties, resolver);
        dispose_properties(properties);
        *self = Frame::Started(info);
        result.map_err(ImportError::from)
    }
}

impl PendingNode {
    /// Route a finished property into identity or the property list.
    fn add_property(
        &mut self,
        property: PendingProperty,
        resolver: &dyn NameResolver,
    ) -> Result<(), ImportError> {
        match Reserved::classify(&property.name) {
            Some(Reserved::PrimaryType) => {
                let type_name = property.extract(|name, values| {
                    resolve_value(first_value(name, values)?, "node type name", resolver)
                })?;
                trace!(node = %self.info.name, type_name = %type_name, "primary type");
                self.info.type_name = Some(type_name);
            }
            Some(Reserved::MixinTypes) => {
                let mixins = property.extract(|_, values| {
                    values
                        .iter()
                        .map(|value| resolve_value(value, "mixin type name", resolver))
                        .collect::<Result<Vec<_>, _>>()
                })?;
                trace!(node = %self.info.name, count = mixins.len(), "mixin types");
                self.info.mixin_names.extend(mixins);
            }
            Some(Reserved::Identifier) => {
                let identifier = property.extract(|name, values| {
                    let text = first_value(name, values)?
                        .retrieve()
                        .map_err(|err| ImportError::io("retrieving", err))?;
                    Ok(text.into_owned())
                })?;
                self.info.identifier = Some(identifier);
            }
            None => self.properties.push(property.into_prop_info()),
        }
        Ok(())
    }
}

/// The property whose values are currently being collected.
#[derive(Debug)]
struct PendingProperty {
    name: QName,
    ty: PropertyType,
    values: Vec<TextValue>,
}

impl PendingProperty {
    /// Read the values, then dispose them whatever the outcome.
    fn extract<T>(
        self,
        read: impl FnOnce(&QName, &[TextValue]) -> Result<T, ImportError>,
    ) -> Result<T, ImportError> {
        let result = read(&self.name, &self.values);
        dispose_all(self.values);
        result
    }

    fn into_prop_info(self) -> PropInfo {
        PropInfo::new(self.name, self.ty, self.values)
    }
}

fn first_value<'v>(name: &QName, values: &'v [TextValue]) -> Result<&'v TextValue, ImportError> {
    values.first().ok_or_else(|| {
        FormatError::MissingValue {
            property: name.to_string(),
        }
        .into()
    })
}

fn resolve_value(
    value: &TextValue,
    role: &'static str,
    resolver: &dyn NameResolver,
) -> Result<QName, ImportError> {
    let text = value
        .retrieve()
        .map_err(|err| ImportError::io("retrieving", err))?;
    resolver
        .resolve(&text)
        .map_err(|source| ImportError::name(role, &text, source))
}

// ============================================================================
// FrameStack
// ============================================================================

/// Nested frames plus the property and value currently open.
#[derive(Debug)]
pub(crate) struct FrameStack {
    frames: Vec<Frame>,
    property: Option<PendingProperty>,
    value: Option<ValueBuffer>,
    config: ImportConfig,
}

impl FrameStack {
    pub(crate) fn new(config: ImportConfig) -> Self {
        FrameStack {
            frames: Vec::new(),
            property: None,
            value: None,
            config,
        }
    }

    /// Number of open nodes.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// `sv:node` start. A still-open parent is committed first.
    pub(crate) fn push_node(
        &mut self,
        raw_name: &str,
        importer: &mut dyn Importer,
        resolver: &dyn NameResolver,
    ) -> Result<(), ImportError> {
        if self.property.is_some() {
            return Err(FormatError::UnexpectedNesting {
                element: "node",
                parent: "property",
            }
            .into());
        }
        if let Some(parent) = self.frames.last_mut() {
            parent.commit(importer, resolver)?;
        }
        let name = resolver
            .resolve(raw_name)
            .map_err(|source| ImportError::name("node name", raw_name, source))?;
        trace!(node = %name, depth = self.frames.len() + 1, "push node");
        self.frames.push(Frame::new(name));
        Ok(())
    }

    /// `sv:node` end: commit if still open, then finalize and pop.
    pub(crate) fn pop_node(
        &mut self,
        importer: &mut dyn Importer,
        resolver: &dyn NameResolver,
    ) -> Result<(), ImportError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(FormatError::UnbalancedEnd { element: "node" })?;
        frame.commit(importer, resolver)?;
        if let Frame::Started(info) = frame {
            debug!(node = %info.name, "end node");
            importer.end_node(info)?;
        }
        self.frames.pop();
        Ok(())
    }

    /// `sv:property` start.
    pub(crate) fn start_property(&mut self, name: QName, ty: PropertyType) -> Result<(), ImportError> {
        if self.property.is_some() {
            return Err(FormatError::UnexpectedNesting {
                element: "property",
                parent: "property",
            }
            .into());
        }
        self.open_top(&name)?;
        trace!(property = %name, ty = %ty, "start property");
        self.property = Some(PendingProperty {
            name,
            ty,
            values: Vec::new(),
        });
        Ok(())
    }

    /// `sv:property` end.
    pub(crate) fn end_property(&mut self, resolver: &dyn NameResolver) -> Result<(), ImportError> {
        let property = self
            .property
            .take()
            .ok_or(FormatError::UnbalancedEnd { element: "property" })?;
        match self.open_top(&property.name) {
            Ok(pending) => pending.add_property(property, resolver),
            Err(err) => {
                dispose_all(property.values);
                Err(err)
            }
        }
    }

    /// `sv:value` start. The declared type picks the buffer variant.
    pub(crate) fn start_value(&mut self) -> Result<(), ImportError> {
        if self.value.is_some() {
            return Err(FormatError::UnexpectedNesting {
                element: "value",
                parent: "value",
            }
            .into());
        }
        let ty = self
            .property
            .as_ref()
            .map(|property| property.ty)
            .ok_or(FormatError::Misplaced {
                element: "value",
                parent: "property",
            })?;
        let buffer = ValueBuffer::for_type(ty, &self.config)
            .map_err(|err| ImportError::io("creating", err))?;
        self.value = Some(buffer);
        Ok(())
    }

    /// Character data; ignored unless a value is open.
    pub(crate) fn characters(&mut self, content: &str) -> Result<(), ImportError> {
        match self.value.as_mut() {
            Some(buffer) => buffer
                .append(content)
                .map_err(|err| ImportError::io("appending to", err)),
            None => Ok(()),
        }
    }

    /// `sv:value` end.
    pub(crate) fn end_value(&mut self) -> Result<(), ImportError> {
        let buffer = self
            .value
            .take()
            .ok_or(FormatError::UnbalancedEnd { element: "value" })?;
        let value = buffer
            .finish()
            .map_err(|err| ImportError::io("finishing", err))?;
        match self.property.as_mut() {
            Some(property) => {
                property.values.push(value);
                Ok(())
            }
            None => {
                dispose_all([value]);
                Err(FormatError::Misplaced {
                    element: "value",
                    parent: "property",
                }
                .into())
            }
        }
    }

    fn open_top(&mut self, property: &QName) -> Result<&mut PendingNode, ImportError> {
        match self.frames.last_mut() {
            Some(Frame::Open(pending)) => Ok(pending),
            Some(Frame::Started(info)) => Err(FormatError::PropertyAfterChild {
                node: info.name.to_string(),
                property: property.to_string(),
            }
            .into()),
            None => Err(FormatError::Misplaced {
                element: "property",
                parent: "node",
            }
            .into()),
        }
    }

    /// Dispose every buffer still owned, committed or not, and clear the stack.
    pub(crate) fn release(&mut self) {
        if let Some(buffer) = self.value.take() {
            if let Err(err) = buffer.dispose() {
                warn!(error = %err, "failed to release open value");
            }
        }
        if let Some(property) = self.property.take() {
            dispose_all(property.values);
        }
        for frame in self.frames.drain(..) {
            if let Frame::Open(pending) = frame {
                dispose_properties(pending.properties);
            }
        }
    }
}

impl Drop for FrameStack {
    fn drop(&mut self) {
        self.release();
    }
}
