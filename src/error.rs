//! Agent errors.
//!
//! Every variant here is fatal to `Agent_OnLoad`: it is logged and turned
//! into `JNI_ERR` at the JVM boundary. Failures after load (unreadable
//! class, missing marker method, rejected breakpoint) are not errors; they
//! are [`WatchOutcome`](crate::watcher::WatchOutcome)s. Options that are not
//! understood are [`RejectedOption`](crate::config::RejectedOption)s and
//! only logged.

use thiserror::Error;

use crate::sys::jni;

pub use crate::sys::jvmti::jvmtiError as JvmtiError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("unable to access JVMTI (GetEnv returned {0})")]
    EnvUnavailable(jni::jint),

    #[error("unable to add capabilities: {0}")]
    Capabilities(JvmtiError),

    #[error("unable to set event callbacks: {0}")]
    Callbacks(JvmtiError),

    #[error("unable to enable {event} events: {error}")]
    EnableEvent {
        event: &'static str,
        error: JvmtiError,
    },
}

pub type Result<T, E = AgentError> = std::result::Result<T, E>;
