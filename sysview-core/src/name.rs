//! Qualified names and prefix resolution.
//!
//! Names travel through the system view as prefixed text (`jcr:primaryType`).
//! A [`NameResolver`] maps the prefix to a namespace URI, producing a
//! prefix-independent [`QName`].

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use unicode_xid::UnicodeXID;

/// Namespace of the reserved `jcr:` properties.
pub const NS_JCR_URI: &str = "http://www.jcp.org/jcr/1.0";
/// Namespace of the built-in node types.
pub const NS_NT_URI: &str = "http://www.jcp.org/jcr/nt/1.0";
/// Namespace of the built-in mixin types.
pub const NS_MIX_URI: &str = "http://www.jcp.org/jcr/mix/1.0";
/// Namespace of every system-view element.
pub const NS_SV_URI: &str = "http://www.jcp.org/jcr/sv/1.0";
/// The `xml:` namespace.
pub const NS_XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Characters never allowed in the local part of a name.
const ILLEGAL_CHARS: &[char] = &['/', ':', '[', ']', '*', '|', '\'', '"'];

/// A namespace-resolved name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: String,
    local_name: String,
}

impl QName {
    /// Create a name from a namespace URI (empty for none) and a local part.
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        QName {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// The namespace URI, empty for the default namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The local part.
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Check namespace and local part at once.
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace == namespace && self.local_name == local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

/// Why a name could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Prefix not mapped in the active namespace context.
    #[error("unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Syntactically invalid name.
    #[error("illegal name {name:?}: {reason}")]
    IllegalName { name: String, reason: &'static str },

    /// No prefix mapped to the namespace (formatting only).
    #[error("no prefix registered for namespace {0}")]
    UnknownNamespace(String),
}

/// Maps prefixes to namespace URIs and back.
///
/// Implementors supply the two lookups; parsing and formatting of prefixed
/// names are provided.
pub trait NameResolver {
    /// Namespace URI bound to `prefix`.
    fn uri(&self, prefix: &str) -> Option<&str>;

    /// Prefix bound to `uri`.
    fn prefix(&self, uri: &str) -> Option<&str>;

    /// Resolve prefixed text (`prefix:local` or `local`) to a qualified name.
    fn resolve(&self, text: &str) -> Result<QName, NameError> {
        let (prefix, local) = split_prefixed(text)?;
        let uri = self
            .uri(prefix)
            .ok_or_else(|| NameError::UnknownPrefix(prefix.to_owned()))?;
        Ok(QName::new(uri, local))
    }

    /// Render a qualified name back to prefixed text.
    fn format(&self, name: &QName) -> Result<String, NameError> {
        let prefix = self
            .prefix(name.namespace())
            .ok_or_else(|| NameError::UnknownNamespace(name.namespace().to_owned()))?;
        if prefix.is_empty() {
            Ok(name.local_name().to_owned())
        } else {
            Ok(format!("{}:{}", prefix, name.local_name()))
        }
    }
}

impl<T: NameResolver + ?Sized> NameResolver for &T {
    fn uri(&self, prefix: &str) -> Option<&str> {
        (**self).uri(prefix)
    }

    fn prefix(&self, uri: &str) -> Option<&str> {
        (**self).prefix(uri)
    }
}

/// Split prefixed text into `(prefix, local)`, validating both parts.
pub fn split_prefixed(text: &str) -> Result<(&str, &str), NameError> {
    let (prefix, local) = match memchr::memchr(b':', text.as_bytes()) {
        Some(0) => return Err(illegal(text, "empty prefix")),
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => ("", text),
    };
    if !prefix.is_empty() && !is_xml_name(prefix) {
        return Err(illegal(text, "prefix is not an XML name"));
    }
    check_local_name(text, local)?;
    Ok((prefix, local))
}

fn check_local_name(text: &str, local: &str) -> Result<(), NameError> {
    if local.is_empty() {
        return Err(illegal(text, "empty local name"));
    }
    if local == "." || local == ".." {
        return Err(illegal(text, "reserved path element"));
    }
    if local.contains(ILLEGAL_CHARS) {
        return Err(illegal(text, "illegal character in local name"));
    }
    if local.starts_with(char::is_whitespace) || local.ends_with(char::is_whitespace) {
        return Err(illegal(text, "leading or trailing whitespace"));
    }
    Ok(())
}

/// XML-style name check used for prefixes.
fn is_xml_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_xid_start() => {}
        _ => return false,
    }
    chars.all(|c| c == '-' || c == '.' || c.is_xid_continue())
}

fn illegal(name: &str, reason: &'static str) -> NameError {
    NameError::IllegalName {
        name: name.to_owned(),
        reason,
    }
}

/// In-memory prefix registry.
///
/// `Default` pre-registers the empty prefix and the `jcr`, `nt`, `mix`, `sv`
/// and `xml` prefixes.
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    by_prefix: HashMap<String, String>,
    by_uri: HashMap<String, String>,
}

impl NamespaceRegistry {
    /// Registry with only the empty prefix mapped to the empty namespace.
    pub fn new() -> Self {
        let mut registry = NamespaceRegistry {
            by_prefix: HashMap::new(),
            by_uri: HashMap::new(),
        };
        registry.insert("", "");
        registry
    }

    /// Map `prefix` to `uri`, replacing any earlier binding of either.
    pub fn register(&mut self, prefix: &str, uri: &str) -> Result<(), NameError> {
        if !prefix.is_empty() && !is_xml_name(prefix) {
            return Err(illegal(prefix, "prefix is not an XML name"));
        }
        self.insert(prefix, uri);
        Ok(())
    }

    fn insert(&mut self, prefix: &str, uri: &str) {
        if let Some(old_uri) = self.by_prefix.insert(prefix.to_owned(), uri.to_owned()) {
            self.by_uri.remove(&old_uri);
        }
        if let Some(old_prefix) = self.by_uri.insert(uri.to_owned(), prefix.to_owned()) {
            if old_prefix != prefix {
                self.by_prefix.remove(&old_prefix);
            }
        }
    }

    /// Number of registered prefixes (including the empty one).
    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.insert("jcr", NS_JCR_URI);
        registry.insert("nt", NS_NT_URI);
        registry.insert("mix", NS_MIX_URI);
        registry.insert("sv", NS_SV_URI);
        registry.insert("xml", NS_XML_URI);
        registry
    }
}

impl NameResolver for NamespaceRegistry {
    fn uri(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }

    fn prefix(&self, uri: &str) -> Option<&str> {
        self.by_uri.get(uri).map(String::as_str)
    }
}

// ============================================================================
// Document-declared prefixes
// ============================================================================

/// Prefix bindings declared by the document, scoped to the element that
/// declares them.
///
/// Declarations arrive before the start of their element, which then calls
/// [`enter`](Self::enter); [`leave`](Self::leave) at its end drops them again.
/// The empty prefix is not rebindable: in a JCR name it always denotes the
/// empty namespace.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScopes {
    bindings: Vec<(String, String)>,
    /// Binding count before each open element's declarations.
    marks: Vec<usize>,
    /// Start of the declarations awaiting their element.
    pending: Option<usize>,
}

impl NamespaceScopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri` for the next element and its descendants.
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        if prefix.is_empty() {
            return;
        }
        self.pending.get_or_insert(self.bindings.len());
        self.bindings.push((prefix.to_owned(), uri.to_owned()));
    }

    /// An element starts; pending declarations become its scope.
    pub fn enter(&mut self) {
        let mark = self.pending.take().unwrap_or(self.bindings.len());
        self.marks.push(mark);
    }

    /// An element ends; its declarations go out of scope.
    pub fn leave(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
    }

    /// Innermost binding of `prefix`.
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
        self.marks.clear();
        self.pending = None;
    }
}

/// Document scopes layered over a base resolver.
///
/// A prefix bound in the document shadows the base binding of the same prefix.
pub struct ScopedResolver<'a, R: ?Sized> {
    scopes: &'a NamespaceScopes,
    base: &'a R,
}

impl<'a, R: NameResolver + ?Sized> ScopedResolver<'a, R> {
    pub fn new(scopes: &'a NamespaceScopes, base: &'a R) -> Self {
        ScopedResolver { scopes, base }
    }
}

impl<R: NameResolver + ?Sized> NameResolver for ScopedResolver<'_, R> {
    fn uri(&self, prefix: &str) -> Option<&str> {
        self.scopes.uri(prefix).or_else(|| self.base.uri(prefix))
    }

    fn prefix(&self, uri: &str) -> Option<&str> {
        let declared = self
            .scopes
            .bindings
            .iter()
            .rev()
            .map(|(prefix, _)| prefix.as_str())
            .find(|prefix| self.uri(prefix) == Some(uri));
        declared.or_else(|| {
            self.base
                .prefix(uri)
                .filter(|prefix| self.uri(prefix) == Some(uri))
        })
    }
}
