// Aggregator for device integration tests in `tests/device/`. Everything
// runs against the simulated Ex10.

#[path = "common/mod.rs"]
mod common;

#[path = "device/power_sequence_test.rs"]
mod power_sequence_test;

#[path = "device/event_queue_test.rs"]
mod event_queue_test;

#[path = "device/upload_test.rs"]
mod upload_test;

#[path = "device/timeout_test.rs"]
mod timeout_test;
