//! The event callback table.
//!
//! Two JVMTI events drive the agent, and both are wired here once at load
//! time:
//!
//! | Event          | Handler |
//! |----------------|---------|
//! | `ClassPrepare` | [`Agent::class_prepare`](crate::Agent::class_prepare) |
//! | `Breakpoint`   | [`Agent::breakpoint`](crate::Agent::breakpoint) |
//!
//! The JVM calls the trampolines on whatever thread the event occurs on,
//! possibly concurrently. They look the agent up in
//! [`GLOBAL_AGENT`](crate::GLOBAL_AGENT) and wrap the callback's own
//! `jvmtiEnv` in a [`Jvmti`].

use std::ptr;

use crate::env::{DebugInterface, Jvmti};
use crate::error::{AgentError, Result};
use crate::sys::{jni, jvmti};
use crate::GLOBAL_AGENT;

/// Events enabled for the whole process, with the names used in diagnostics.
pub const WATCHED_EVENTS: [(u32, &str); 2] = [
    (jvmti::JVMTI_EVENT_CLASS_PREPARE, "ClassPrepare"),
    (jvmti::JVMTI_EVENT_BREAKPOINT, "Breakpoint"),
];

unsafe extern "system" fn trampoline_class_prepare(
    env: *mut jvmti::jvmtiEnv,
    jni: *mut jni::JNIEnv,
    thread: jni::jthread,
    klass: jni::jclass,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        let jvmti = Jvmti::from_raw(env);
        agent.class_prepare(&jvmti, jni, thread, klass);
    }
}

unsafe extern "system" fn trampoline_breakpoint(
    env: *mut jvmti::jvmtiEnv,
    jni: *mut jni::JNIEnv,
    thread: jni::jthread,
    method: jni::jmethodID,
    location: jvmti::jlocation,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        let jvmti = Jvmti::from_raw(env);
        agent.breakpoint(&jvmti, jni, thread, method, location);
    }
}

/// A `jvmtiEventCallbacks` with exactly `ClassPrepare` and `Breakpoint`
/// routed to the global agent.
pub fn callback_table() -> jvmti::jvmtiEventCallbacks {
    jvmti::jvmtiEventCallbacks {
        ClassPrepare: Some(trampoline_class_prepare),
        Breakpoint: Some(trampoline_breakpoint),
        ..Default::default()
    }
}

/// Install `callbacks` and enable every event in [`WATCHED_EVENTS`]
/// globally. The first failure aborts registration.
pub fn register<D: DebugInterface + ?Sized>(
    iface: &D,
    callbacks: &jvmti::jvmtiEventCallbacks,
) -> Result<()> {
    iface.set_event_callbacks(callbacks).map_err(AgentError::Callbacks)?;

    for (event, name) in WATCHED_EVENTS {
        iface
            .set_event_notification_mode(true, event, ptr::null_mut())
            .map_err(|error| AgentError::EnableEvent { event: name, error })?;
        log::debug!("enabled {} events", name);
    }
    Ok(())
}
