//! Running documents through the importer and checking the outcome

use pretty_assertions::assert_eq;
use sysview_core::{import_str, ImportError, ImportHandler};

use crate::common::{Recorder, TestCase};

/// Import `xml` into a fresh recorder.
pub fn run_xml(xml: &str, recorder: Recorder) -> (Vec<String>, Result<(), ImportError>) {
    let mut handler = ImportHandler::new(recorder);
    let result = import_str(xml, &mut handler);
    (handler.into_importer().calls, result)
}

/// Run a fixture case, panicking with a diff on mismatch.
pub fn run_case(case: &TestCase) {
    let (calls, result) = run_xml(&case.xml, Recorder::new());
    match (case.error, result) {
        (None, Ok(())) => {}
        (None, Err(err)) => panic!("[{}] {}: unexpected error: {}", case.id, case.desc, err),
        (Some(kind), Ok(())) => panic!("[{}] {}: expected {:?} error", case.id, case.desc, kind),
        (Some(kind), Err(err)) => assert!(
            kind.matches(&err),
            "[{}] expected {:?} error, got: {}",
            case.id,
            kind,
            err
        ),
    }
    assert_eq!(calls, case.calls, "[{}] {}", case.id, case.desc);
}
