#![allow(dead_code)]

pub mod builders;
pub mod strategies;

pub use builders::*;

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the crate's subscriber once per test binary
pub fn init_test_logging() {
    INIT.call_once(|| {
        std::env::set_var("TASKS_ENV", "test");
        tasks_cloud::init_structured_logging();
    });
}
