//! XML driver.
//!
//! Runs a namespace-aware `quick-xml` reader over a document and feeds the
//! resulting events into an [`ImportHandler`]. Empty elements are delivered
//! as a start immediately followed by an end. Namespace declarations are not
//! passed on as attributes; each prefixed one is reported as a prefix mapping
//! just before its element starts, so names in the document may use prefixes
//! the configured registry does not know.

use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::NsReader;
use tracing::debug_span;

use crate::error::ImportError;
use crate::event::Attribute;
use crate::handler::ImportHandler;
use crate::importer::Importer;
use crate::name::NameResolver;

/// Import a system-view document from a buffered reader.
///
/// On any failure the handler is aborted before the error is returned.
pub fn import_reader<B, I, R>(source: B, handler: &mut ImportHandler<I, R>) -> Result<(), ImportError>
where
    B: BufRead,
    I: Importer,
    R: NameResolver,
{
    let span = debug_span!("sysview_import");
    let _enter = span.enter();

    let mut reader = NsReader::from_reader(source);
    reader.config_mut().expand_empty_elements = true;

    let result = drive(&mut reader, handler);
    if result.is_err() {
        handler.abort();
    }
    result
}

/// Import a system-view document held in memory.
pub fn import_str<I, R>(xml: &str, handler: &mut ImportHandler<I, R>) -> Result<(), ImportError>
where
    I: Importer,
    R: NameResolver,
{
    import_reader(xml.as_bytes(), handler)
}

fn drive<B, I, R>(reader: &mut NsReader<B>, handler: &mut ImportHandler<I, R>) -> Result<(), ImportError>
where
    B: BufRead,
    I: Importer,
    R: NameResolver,
{
    let mut buf = Vec::new();
    handler.start_document()?;
    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let namespace = owned_namespace(resolved)?;
        match event {
            XmlEvent::Start(start) => {
                let (declarations, attributes) = attributes(reader, &start)?;
                for (prefix, uri) in &declarations {
                    handler.start_prefix_mapping(prefix, uri)?;
                }
                let local_name = std::str::from_utf8(start.local_name().into_inner())?;
                handler.start_element(namespace.as_deref(), local_name, &attributes)?;
            }
            XmlEvent::End(end) => {
                let local_name = std::str::from_utf8(end.local_name().into_inner())?;
                handler.end_element(namespace.as_deref(), local_name)?;
            }
            XmlEvent::Text(text) => handler.characters(&text.unescape()?)?,
            XmlEvent::CData(data) => handler.characters(std::str::from_utf8(&data)?)?,
            XmlEvent::Eof => break,
            // Declarations, comments, processing instructions and doctype
            _ => {}
        }
        buf.clear();
    }
    handler.end_document()
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, ImportError> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(std::str::from_utf8(ns.into_inner())?.to_owned())),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => Ok(None),
    }
}

type Declarations = Vec<(String, String)>;

/// Split an element's attributes into prefixed namespace declarations and
/// ordinary attributes. Default namespace declarations only affect element
/// names and are dropped here.
fn attributes<B>(
    reader: &NsReader<B>,
    start: &BytesStart<'_>,
) -> Result<(Declarations, Vec<Attribute<'static>>), ImportError> {
    let mut declarations = Vec::new();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        match attr.key.as_namespace_binding() {
            Some(PrefixDeclaration::Named(prefix)) => {
                let prefix = std::str::from_utf8(prefix)?.to_owned();
                declarations.push((prefix, attr.unescape_value()?.into_owned()));
                continue;
            }
            Some(PrefixDeclaration::Default) => continue,
            None => {}
        }
        let (resolved, local_name) = reader.resolve_attribute(attr.key);
        let namespace = owned_namespace(resolved)?;
        let local_name = std::str::from_utf8(local_name.into_inner())?.to_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push(Attribute {
            namespace: namespace.map(Cow::Owned),
            local_name: Cow::Owned(local_name),
            value: Cow::Owned(value),
        });
    }
    Ok((declarations, attributes))
}
