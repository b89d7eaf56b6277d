//! Random system-view documents
//!
//! Uses seeded RNG for reproducibility. Print seed on failure for replay.

use quick_xml::escape::escape;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::recorder::start_node_line;
use super::SV;

const PRIMARY_TYPES: &[&str] = &["nt:unstructured", "nt:folder", "nt:file", "nt:resource"];
const MIXIN_TYPES: &[&str] = &[
    "mix:versionable",
    "mix:lockable",
    "mix:referenceable",
    "mix:title",
];

/// A node as the generator intends it to arrive at the importer.
#[derive(Debug, Clone)]
pub struct Tree {
    pub name: String,
    pub primary: Option<String>,
    pub mixins: Vec<String>,
    pub uuid: Option<String>,
    /// Ordinary String properties in document order
    pub props: Vec<(String, Vec<String>)>,
    pub children: Vec<Tree>,
}

impl Tree {
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Tree::node_count).sum::<usize>()
    }

    /// The recorder lines a correct import produces.
    pub fn expected_calls(&self) -> Vec<String> {
        let mut calls = vec!["start".to_owned()];
        self.push_calls(&mut calls);
        calls.push("end".to_owned());
        calls
    }

    fn push_calls(&self, calls: &mut Vec<String>) {
        let props: Vec<String> = self
            .props
            .iter()
            .map(|(name, values)| format!("{}:String={:?}", name, values))
            .collect();
        calls.push(start_node_line(
            &self.name,
            self.primary.as_deref(),
            &self.mixins,
            self.uuid.as_deref(),
            &props,
        ));
        for child in &self.children {
            child.push_calls(calls);
        }
        calls.push(format!("end_node {}", self.name));
    }
}

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("SYSVIEW_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    fn pick(&mut self, choices: &[&str]) -> String {
        choices[self.rng.gen_range(0..choices.len())].to_owned()
    }

    /// Random unprefixed name
    pub fn name(&mut self) -> String {
        let len = 1 + self.geometric(0.7);
        let chars = b"abcdefghijklmnopqrstuvwxyz0123456789_";
        let mut name = String::with_capacity(len);
        name.push(char::from(self.rng.gen_range(b'a'..=b'z')));
        for _ in 1..len {
            name.push(char::from(chars[self.rng.gen_range(0..chars.len())]));
        }
        name
    }

    /// Value text, including markup characters and edge whitespace
    pub fn text(&mut self) -> String {
        let len = self.geometric(0.85);
        let chars = ['a', 'b', 'z', '0', '9', ' ', '\t', '&', '<', '>', '"', '\'', 'é', '→'];
        (0..len)
            .map(|_| chars[self.rng.gen_range(0..chars.len())])
            .collect()
    }

    pub fn uuid(&mut self) -> String {
        format!(
            "{:08x}-{:04x}-{:04x}",
            self.rng.gen::<u32>(),
            self.rng.gen::<u16>(),
            self.rng.gen::<u16>()
        )
    }

    /// Random tree, at most `depth` levels below the root
    pub fn tree(&mut self, depth: usize) -> Tree {
        let primary = self.chance(0.7).then(|| self.pick(PRIMARY_TYPES));
        let mixins = (0..self.geometric(0.4))
            .map(|_| self.pick(MIXIN_TYPES))
            .collect();
        let uuid = self.chance(0.3).then(|| self.uuid());
        let props = (0..self.geometric(0.6))
            .map(|_| {
                let values = (0..self.geometric(0.5).max(1)).map(|_| self.text()).collect();
                (format!("p_{}", self.name()), values)
            })
            .collect();
        let children = if depth == 0 {
            Vec::new()
        } else {
            (0..self.geometric(0.5)).map(|_| self.tree(depth - 1)).collect()
        };
        Tree {
            name: self.name(),
            primary,
            mixins,
            uuid,
            props,
            children,
        }
    }

    /// Serialize `tree`, scattering identity properties among the ordinary ones
    pub fn render(&mut self, tree: &Tree) -> String {
        let mut out = String::new();
        if self.chance(0.5) {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        self.render_node(tree, 0, &mut out);
        out
    }

    fn render_node(&mut self, node: &Tree, depth: usize, out: &mut String) {
        self.indent(depth, out);
        let decl = if depth == 0 {
            format!(" xmlns:sv=\"{}\"", SV)
        } else {
            String::new()
        };
        let name_attr = self.attr("name");
        out.push_str(&format!("<sv:node{} {}=\"{}\">", decl, name_attr, node.name));

        let mut items: Vec<(String, &str, Vec<String>)> = node
            .props
            .iter()
            .map(|(name, values)| (name.clone(), "String", values.clone()))
            .collect();
        let mut identity = Vec::new();
        if let Some(primary) = &node.primary {
            identity.push(("jcr:primaryType".to_owned(), "Name", vec![primary.clone()]));
        }
        if !node.mixins.is_empty() {
            identity.push(("jcr:mixinTypes".to_owned(), "Name", node.mixins.clone()));
        }
        if let Some(uuid) = &node.uuid {
            identity.push(("jcr:uuid".to_owned(), "String", vec![uuid.clone()]));
        }
        for item in identity {
            let at = self.rng.gen_range(0..=items.len());
            items.insert(at, item);
        }

        for (name, ty, values) in &items {
            self.indent(depth + 1, out);
            let name_attr = self.attr("name");
            let type_attr = self.attr("type");
            out.push_str(&format!(
                "<sv:property {}=\"{}\" {}=\"{}\">",
                name_attr, name, type_attr, ty
            ));
            for value in values {
                self.indent(depth + 2, out);
                if value.is_empty() && self.chance(0.5) {
                    out.push_str("<sv:value/>");
                } else {
                    out.push_str("<sv:value>");
                    out.push_str(&escape(value.as_str()));
                    out.push_str("</sv:value>");
                }
            }
            self.indent(depth + 1, out);
            out.push_str("</sv:property>");
        }

        for child in &node.children {
            self.render_node(child, depth + 1, out);
        }
        self.indent(depth, out);
        out.push_str("</sv:node>");
    }

    /// Attribute name, qualified or not
    fn attr(&mut self, local: &'static str) -> &'static str {
        match (local, self.chance(0.3)) {
            ("name", true) => "name",
            ("name", false) => "sv:name",
            ("type", true) => "type",
            _ => "sv:type",
        }
    }

    fn indent(&mut self, depth: usize, out: &mut String) {
        if self.chance(0.8) {
            out.push('\n');
            out.push_str(&"  ".repeat(depth));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducibility() {
        let mut g1 = Gen::new(42);
        let mut g2 = Gen::new(42);
        let (t1, t2) = (g1.tree(3), g2.tree(3));
        assert_eq!(g1.render(&t1), g2.render(&t2));
    }
}
