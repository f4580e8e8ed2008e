#![allow(unused_imports)]

pub use hidkitd_test_utils::builders;
pub use hidkitd_test_utils::harness::{Harness, RunningDaemon};
pub use hidkitd_test_utils::recording_runner::RecordingRunner;
pub use hidkitd_test_utils::{init_tracing, wait_until, with_timeout};
