//! Test infrastructure for system-view import
//!
//! Provides a recording importer, fixture loading, and random document generation.

#![allow(dead_code)]

mod generators;
mod harness;
mod loader;
mod recorder;

pub use generators::{Gen, Tree};
pub use harness::{run_case, run_xml};
pub use loader::{load_fixtures_by_name, ErrorKind, TestCase};
pub use recorder::Recorder;

pub const SV: &str = sysview_core::name::NS_SV_URI;

/// Route `tracing` output to the test writer; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
