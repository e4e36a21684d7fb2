//! Shared interpreter fixture for integration tests
//!
//! The embedded interpreter is process-wide, so each test binary starts it
//! exactly once and never finalizes it. The helper-module directory is put
//! on the search path so tests can import `objects`.

use std::sync::OnceLock;

use python_bridge_core_rs::Runtime;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

pub fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        let helpers = format!("{}/tests/python", env!("CARGO_MANIFEST_DIR"));
        Runtime::start([helpers.as_str()]).expect("embedded interpreter failed to start")
    })
}
