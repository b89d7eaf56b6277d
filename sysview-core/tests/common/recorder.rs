//! Importer that records every call as one line of text

use std::io::Read;

use sysview_core::{
    Importer, NameResolver, NamespaceRegistry, NodeInfo, PropInfo, PropertyType, QName,
    RepositoryError,
};

/// Records calls in the form used by the fixtures:
///
/// ```text
/// start
/// start_node foo type=nt:unstructured mixins=[] id=None props=[bar:String=["hello"]]
/// end_node foo
/// end
/// ```
///
/// Binary values are recorded by decoded length, `"<n> bytes"`.
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<String>,
    /// Refuse `start_node` for the node with this (prefixed) name.
    pub fail_on: Option<String>,
    names: NamespaceRegistry,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(name: &str) -> Self {
        Recorder {
            fail_on: Some(name.to_owned()),
            ..Self::default()
        }
    }

    fn name(&self, name: &QName) -> String {
        self.names.format(name).unwrap_or_else(|_| name.to_string())
    }

    fn property(&self, prop: &PropInfo) -> String {
        let values: Vec<String> = prop
            .values
            .iter()
            .map(|value| {
                if prop.ty == PropertyType::Binary {
                    let mut bytes = Vec::new();
                    value
                        .binary_reader()
                        .and_then(|mut reader| reader.read_to_end(&mut bytes))
                        .expect("binary value readable");
                    format!("{} bytes", bytes.len())
                } else {
                    value.retrieve().expect("value readable").into_owned()
                }
            })
            .collect();
        format!("{}:{}={:?}", self.name(&prop.name), prop.ty, values)
    }
}

/// Render a `start_node` call.
pub fn start_node_line(
    name: &str,
    type_name: Option<&str>,
    mixins: &[String],
    id: Option<&str>,
    props: &[String],
) -> String {
    format!(
        "start_node {} type={} mixins=[{}] id={:?} props=[{}]",
        name,
        type_name.unwrap_or("-"),
        mixins.join(", "),
        id,
        props.join("; ")
    )
}

impl Importer for Recorder {
    fn start(&mut self) -> Result<(), RepositoryError> {
        self.calls.push("start".to_owned());
        Ok(())
    }

    fn start_node(
        &mut self,
        node: &NodeInfo,
        properties: &[PropInfo],
        _resolver: &dyn NameResolver,
    ) -> Result<(), RepositoryError> {
        let name = self.name(&node.name);
        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Err(RepositoryError::new(format!("cannot create {}", name)));
        }
        let type_name = node.type_name.as_ref().map(|t| self.name(t));
        let mixins: Vec<String> = node.mixin_names.iter().map(|m| self.name(m)).collect();
        let props: Vec<String> = properties.iter().map(|p| self.property(p)).collect();
        let line = start_node_line(
            &name,
            type_name.as_deref(),
            &mixins,
            node.identifier.as_deref(),
            &props,
        );
        self.calls.push(line);
        Ok(())
    }

    fn end_node(&mut self, node: &NodeInfo) -> Result<(), RepositoryError> {
        let line = format!("end_node {}", self.name(&node.name));
        self.calls.push(line);
        Ok(())
    }

    fn end(&mut self) -> Result<(), RepositoryError> {
        self.calls.push("end".to_owned());
        Ok(())
    }
}
