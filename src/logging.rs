//! Diagnostic output.
//!
//! The agent reports its milestones through the `log` facade; this module
//! wires the facade to `env_logger` once per process.

use env_logger::{Builder, Env};

/// Environment variable consulted when no `log=` option is given.
pub const LOG_ENV: &str = "CONCOLIC_AGENT_LOG";

pub const DEFAULT_FILTER: &str = "info";

/// Install the logger. An explicit `filter` wins over [`LOG_ENV`], which
/// wins over [`DEFAULT_FILTER`].
///
/// Returns false if a logger was already installed (a second load in the
/// same process, or a test harness that got there first).
pub fn init(filter: Option<&str>) -> bool {
    let mut builder = match filter {
        Some(filter) => {
            let mut builder = Builder::new();
            builder.parse_filters(filter);
            builder
        }
        None => Builder::from_env(Env::new().filter_or(LOG_ENV, DEFAULT_FILTER)),
    };

    builder.format_timestamp_millis().try_init().is_ok()
}
