//! Fixture loading from YAML files

use serde::Deserialize;
use std::path::Path;

use sysview_core::ImportError;

/// A single test case from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub desc: String,
    pub xml: String,
    /// Importer calls in order, as rendered by the recorder
    #[serde(default)]
    pub calls: Vec<String>,
    /// Expected failure, if the import must not succeed
    #[serde(default)]
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    Name,
    Io,
    Repository,
    Xml,
}

impl ErrorKind {
    pub fn matches(self, err: &ImportError) -> bool {
        matches!(
            (self, err),
            (ErrorKind::Format, ImportError::Format(_))
                | (ErrorKind::Name, ImportError::Name { .. })
                | (ErrorKind::Io, ImportError::Io { .. })
                | (ErrorKind::Repository, ImportError::Repository(_))
                | (ErrorKind::Xml, ImportError::Xml(_))
        )
    }
}

/// Load all test cases from a YAML fixture file
pub fn load_fixtures(path: &Path) -> Vec<TestCase> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

/// Load fixtures from the standard fixtures directory
pub fn load_fixtures_by_name(name: &str) -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.yaml", name));
    load_fixtures(&path)
}
