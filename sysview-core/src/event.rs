//! Structural events - the input of the importer.
//!
//! This is a SAX-style event model: a tokenizer pushes one event at a time,
//! with structure represented by start/end element pairs and character data
//! delivered in arbitrary chunks.
//!
//! A system-view document reads as:
//! ```text
//! DocumentStart
//! PrefixMapping { "sv", "http://www.jcp.org/jcr/sv/1.0" }
//! ElementStart { sv:node, sv:name="foo" }
//!   ElementStart { sv:property, sv:name="jcr:primaryType", sv:type="Name" }
//!     ElementStart { sv:value }
//!     Characters("nt:unstructured")
//!     ElementEnd { sv:value }
//!   ElementEnd { sv:property }
//!   ElementStart { sv:node, sv:name="child" } ... ElementEnd { sv:node }
//! ElementEnd { sv:node }
//! DocumentEnd
//! ```

use std::borrow::Cow;

/// One structural event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    DocumentStart,

    /// Namespace declaration of the element that starts next. Names inside
    /// that element may use `prefix`.
    PrefixMapping {
        prefix: Cow<'a, str>,
        uri: Cow<'a, str>,
    },

    /// Element start. `namespace` is the resolved URI, `None` when unbound.
    ElementStart {
        namespace: Option<Cow<'a, str>>,
        local_name: Cow<'a, str>,
        attributes: Vec<Attribute<'a>>,
    },

    /// A chunk of character data.
    ///
    /// `whitespace` marks ignorable whitespace. It is informational only: the
    /// handler treats both kinds alike, as value content inside `sv:value`
    /// and ignored everywhere else.
    Characters {
        content: Cow<'a, str>,
        whitespace: bool,
    },

    /// Element end.
    ElementEnd {
        namespace: Option<Cow<'a, str>>,
        local_name: Cow<'a, str>,
    },

    DocumentEnd,
}

impl<'a> Event<'a> {
    /// Element start in `namespace`.
    pub fn start(
        namespace: &'a str,
        local_name: &'a str,
        attributes: Vec<Attribute<'a>>,
    ) -> Self {
        Event::ElementStart {
            namespace: Some(Cow::Borrowed(namespace)),
            local_name: Cow::Borrowed(local_name),
            attributes,
        }
    }

    /// Element end in `namespace`.
    pub fn end(namespace: &'a str, local_name: &'a str) -> Self {
        Event::ElementEnd {
            namespace: Some(Cow::Borrowed(namespace)),
            local_name: Cow::Borrowed(local_name),
        }
    }

    /// Character data, flagged as whitespace when it is nothing else.
    pub fn text(content: impl Into<Cow<'a, str>>) -> Self {
        let content = content.into();
        let whitespace = content.chars().all(char::is_whitespace);
        Event::Characters {
            content,
            whitespace,
        }
    }

    /// Namespace declaration.
    pub fn prefix_mapping(prefix: &'a str, uri: &'a str) -> Self {
        Event::PrefixMapping {
            prefix: Cow::Borrowed(prefix),
            uri: Cow::Borrowed(uri),
        }
    }

    /// Check if this is an element start or end.
    pub fn is_element(&self) -> bool {
        matches!(self, Event::ElementStart { .. } | Event::ElementEnd { .. })
    }

    /// Local name of an element event.
    pub fn local_name(&self) -> Option<&str> {
        match self {
            Event::ElementStart { local_name, .. } | Event::ElementEnd { local_name, .. } => {
                Some(local_name.as_ref())
            }
            _ => None,
        }
    }

    /// Detach from the source buffer.
    pub fn into_owned(self) -> Event<'static> {
        match self {
            Event::DocumentStart => Event::DocumentStart,
            Event::PrefixMapping { prefix, uri } => Event::PrefixMapping {
                prefix: Cow::Owned(prefix.into_owned()),
                uri: Cow::Owned(uri.into_owned()),
            },
            Event::ElementStart {
                namespace,
                local_name,
                attributes,
            } => Event::ElementStart {
                namespace: namespace.map(|ns| Cow::Owned(ns.into_owned())),
                local_name: Cow::Owned(local_name.into_owned()),
                attributes: attributes.into_iter().map(Attribute::into_owned).collect(),
            },
            Event::Characters {
                content,
                whitespace,
            } => Event::Characters {
                content: Cow::Owned(content.into_owned()),
                whitespace,
            },
            Event::ElementEnd {
                namespace,
                local_name,
            } => Event::ElementEnd {
                namespace: namespace.map(|ns| Cow::Owned(ns.into_owned())),
                local_name: Cow::Owned(local_name.into_owned()),
            },
            Event::DocumentEnd => Event::DocumentEnd,
        }
    }
}

/// An element attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub namespace: Option<Cow<'a, str>>,
    pub local_name: Cow<'a, str>,
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    /// Unqualified attribute.
    pub fn new(local_name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Attribute {
            namespace: None,
            local_name: local_name.into(),
            value: value.into(),
        }
    }

    /// Attribute in `namespace`.
    pub fn qualified(
        namespace: impl Into<Cow<'a, str>>,
        local_name: impl Into<Cow<'a, str>>,
        value: impl Into<Cow<'a, str>>,
    ) -> Self {
        Attribute {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
            value: value.into(),
        }
    }

    pub fn into_owned(self) -> Attribute<'static> {
        Attribute {
            namespace: self.namespace.map(|ns| Cow::Owned(ns.into_owned())),
            local_name: Cow::Owned(self.local_name.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_whitespace_flag() {
        assert!(matches!(Event::text("  \n\t"), Event::Characters { whitespace: true, .. }));
        assert!(matches!(Event::text(" a "), Event::Characters { whitespace: false, .. }));
    }

    #[test]
    fn test_into_owned() {
        let owned = {
            let name = String::from("foo");
            Event::start("urn:x", "node", vec![Attribute::new("name", name.as_str())]).into_owned()
        };
        assert_eq!(owned.local_name(), Some("node"));
        assert!(owned.is_element());
        assert!(!Event::DocumentEnd.is_element());

        let owned = {
            let uri = String::from("urn:acme");
            Event::prefix_mapping("acme", &uri).into_owned()
        };
        assert_eq!(owned, Event::prefix_mapping("acme", "urn:acme"));
    }
}
