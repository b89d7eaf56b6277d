//! Event dispatcher.
//!
//! [`ImportHandler`] validates each structural event against the system-view
//! vocabulary and routes it to the frame stack. It is push-driven: feed it
//! events one at a time through [`ImportHandler::handle`] or the per-event
//! methods, in document order.
//!
//! The first error aborts the import. Every value buffer still owned is
//! disposed before the error is returned, and any later event fails with
//! [`ImportError::Aborted`].

use phf::phf_map;
use tracing::{debug, trace};

use crate::config::ImportConfig;
use crate::error::{FormatError, ImportError};
use crate::event::{Attribute, Event};
use crate::frame::FrameStack;
use crate::importer::Importer;
use crate::name::{NameResolver, NamespaceRegistry, NamespaceScopes, ScopedResolver, NS_SV_URI};
use crate::property::PropertyType;

/// The three elements of the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Node,
    Property,
    Value,
}

static ELEMENTS: phf::Map<&'static str, Element> = phf_map! {
    "node" => Element::Node,
    "property" => Element::Property,
    "value" => Element::Value,
};

fn classify(namespace: Option<&str>, local_name: &str) -> Result<Element, FormatError> {
    if namespace != Some(NS_SV_URI) {
        return Err(FormatError::WrongNamespace {
            found: namespace.map(str::to_owned),
        });
    }
    ELEMENTS
        .get(local_name)
        .copied()
        .ok_or_else(|| FormatError::UnexpectedElement {
            name: local_name.to_owned(),
        })
}

/// Value of `sv:<local>` or unqualified `<local>`.
fn find_attribute<'v>(attributes: &'v [Attribute<'_>], local: &str) -> Option<&'v str> {
    attributes
        .iter()
        .find(|attr| {
            attr.local_name == local
                && attr.namespace.as_deref().map_or(true, |ns| ns == NS_SV_URI)
        })
        .map(|attr| attr.value.as_ref())
}

fn required<'v>(
    attributes: &'v [Attribute<'_>],
    element: &'static str,
    attribute: &'static str,
) -> Result<&'v str, FormatError> {
    find_attribute(attributes, attribute).ok_or(FormatError::MissingAttribute { element, attribute })
}

/// Streaming system-view import.
///
/// ```
/// use sysview_core::{Event, ImportHandler, Importer, NameResolver, NodeInfo, PropInfo, RepositoryError};
/// use sysview_core::event::Attribute;
///
/// #[derive(Default)]
/// struct Names(Vec<String>);
///
/// impl Importer for Names {
///     fn start(&mut self) -> Result<(), RepositoryError> { Ok(()) }
///     fn start_node(&mut self, node: &NodeInfo, _: &[PropInfo], _: &dyn NameResolver) -> Result<(), RepositoryError> {
///         self.0.push(node.name.local_name().to_owned());
///         Ok(())
///     }
///     fn end_node(&mut self, _: &NodeInfo) -> Result<(), RepositoryError> { Ok(()) }
///     fn end(&mut self) -> Result<(), RepositoryError> { Ok(()) }
/// }
///
/// const SV: &str = "http://www.jcp.org/jcr/sv/1.0";
/// let mut handler = ImportHandler::new(Names::default());
/// handler.handle(&Event::DocumentStart)?;
/// handler.handle(&Event::start(SV, "node", vec![Attribute::new("name", "foo")]))?;
/// handler.handle(&Event::end(SV, "node"))?;
/// handler.handle(&Event::DocumentEnd)?;
/// assert_eq!(handler.into_importer().0, vec!["foo"]);
/// # Ok::<(), sysview_core::ImportError>(())
/// ```
pub struct ImportHandler<I, R = NamespaceRegistry> {
    importer: I,
    resolver: R,
    scopes: NamespaceScopes,
    stack: FrameStack,
    aborted: bool,
}

impl<I: Importer> ImportHandler<I> {
    /// Handler with the default namespace registry and configuration.
    pub fn new(importer: I) -> Self {
        ImportHandler::with_resolver(importer, NamespaceRegistry::default())
    }
}

impl<I: Importer, R: NameResolver> ImportHandler<I, R> {
    pub fn with_resolver(importer: I, resolver: R) -> Self {
        ImportHandler::with_config(importer, resolver, ImportConfig::default())
    }

    pub fn with_config(importer: I, resolver: R, config: ImportConfig) -> Self {
        ImportHandler {
            importer,
            resolver,
            scopes: NamespaceScopes::new(),
            stack: FrameStack::new(config),
            aborted: false,
        }
    }

    /// Dispatch one event.
    pub fn handle(&mut self, event: &Event<'_>) -> Result<(), ImportError> {
        match event {
            Event::DocumentStart => self.start_document(),
            Event::PrefixMapping { prefix, uri } => self.start_prefix_mapping(prefix, uri),
            Event::ElementStart {
                namespace,
                local_name,
                attributes,
            } => self.start_element(namespace.as_deref(), local_name, attributes),
            Event::Characters { content, .. } => self.characters(content),
            Event::ElementEnd {
                namespace,
                local_name,
            } => self.end_element(namespace.as_deref(), local_name),
            Event::DocumentEnd => self.end_document(),
        }
    }

    pub fn start_document(&mut self) -> Result<(), ImportError> {
        self.guarded(|this| {
            debug!("start import");
            this.importer.start().map_err(ImportError::from)
        })
    }

    /// A namespace declaration of the element about to start.
    ///
    /// Prefixed names inside that element resolve against the declared
    /// bindings first, then against the configured resolver.
    pub fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<(), ImportError> {
        self.guarded(|this| {
            trace!(prefix, uri, "prefix mapping");
            this.scopes.declare(prefix, uri);
            Ok(())
        })
    }

    pub fn start_element(
        &mut self,
        namespace: Option<&str>,
        local_name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<(), ImportError> {
        self.guarded(|this| {
            this.scopes.enter();
            let element = classify(namespace, local_name)?;
            trace!(element = local_name, depth = this.stack.depth(), "element start");
            let resolver = ScopedResolver::new(&this.scopes, &this.resolver);
            match element {
                Element::Node => {
                    let name = required(attributes, "node", "name")?;
                    this.stack.push_node(name, &mut this.importer, &resolver)
                }
                Element::Property => {
                    let raw = required(attributes, "property", "name")?;
                    let name = resolver
                        .resolve(raw)
                        .map_err(|source| ImportError::name("property name", raw, source))?;
                    let token = required(attributes, "property", "type")?;
                    let ty = PropertyType::from_name(token).ok_or_else(|| {
                        FormatError::UnknownPropertyType {
                            token: token.to_owned(),
                        }
                    })?;
                    this.stack.start_property(name, ty)
                }
                Element::Value => this.stack.start_value(),
            }
        })
    }

    /// Character data. Whitespace is content inside a value and ignored elsewhere.
    pub fn characters(&mut self, content: &str) -> Result<(), ImportError> {
        self.guarded(|this| this.stack.characters(content))
    }

    pub fn end_element(&mut self, namespace: Option<&str>, local_name: &str) -> Result<(), ImportError> {
        self.guarded(|this| {
            let element = classify(namespace, local_name)?;
            trace!(element = local_name, depth = this.stack.depth(), "element end");
            let resolver = ScopedResolver::new(&this.scopes, &this.resolver);
            let result = match element {
                Element::Node => this.stack.pop_node(&mut this.importer, &resolver),
                Element::Property => this.stack.end_property(&resolver),
                Element::Value => this.stack.end_value(),
            };
            this.scopes.leave();
            result
        })
    }

    pub fn end_document(&mut self) -> Result<(), ImportError> {
        self.guarded(|this| {
            let open = this.stack.depth();
            if open > 0 {
                return Err(FormatError::UnclosedNodes { open }.into());
            }
            this.importer.end()?;
            debug!("import finished");
            Ok(())
        })
    }

    fn guarded(
        &mut self,
        step: impl FnOnce(&mut Self) -> Result<(), ImportError>,
    ) -> Result<(), ImportError> {
        if self.aborted {
            return Err(ImportError::Aborted);
        }
        let result = step(self);
        if let Err(err) = &result {
            debug!(error = %err, "import failed");
            self.abort();
        }
        result
    }
}

impl<I, R> ImportHandler<I, R> {
    /// Stop the import and release every buffer it still owns.
    ///
    /// Idempotent. Later events fail with [`ImportError::Aborted`].
    pub fn abort(&mut self) {
        if !self.aborted {
            debug!(depth = self.stack.depth(), "abort import");
            self.aborted = true;
        }
        self.stack.release();
        self.scopes.clear();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Number of open `sv:node` elements.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn config(&self) -> &ImportConfig {
        self.stack.config()
    }

    pub fn importer(&self) -> &I {
        &self.importer
    }

    pub fn importer_mut(&mut self) -> &mut I {
        &mut self.importer
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Give up the handler, returning the importer.
    pub fn into_importer(self) -> I {
        self.importer
    }
}
