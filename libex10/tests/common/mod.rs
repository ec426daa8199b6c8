// Shared helpers for the integration test crates. Each aggregator pulls
// this in with `#[path]`, so not every helper is used everywhere.
#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;

/// Route `log` output through env_logger; set RUST_LOG to see it.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
