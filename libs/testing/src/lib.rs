//! # fctl-testing
//!
//! Small helpers shared by the harness, the scenario tests, and the runner:
//!
//! - `poll`: eventually/consistently style polling with fixed intervals
//! - `names`: unique suffixes, random names, and per-test IDs
//! - `env`: scoped environment variable overrides
//! - `trace`: tracing subscriber setup for tests

mod env;
mod names;
pub mod poll;
mod trace;

pub use env::EnvGuard;
pub use names::{new_test_id, rand_string, short_id, unique_suffix};
pub use poll::{
    consistently, eventually, eventually_eq, eventually_slow, PollConfig, PollError,
    LONG_TIMEOUT, POLLING, POLLING_LONG, TIMEOUT,
};
pub use trace::init_tracing;
