//! # concolic-agent
//!
//! A JVMTI agent that gives a concolic execution engine a synchronous hook
//! into a running Java program.
//!
//! The target program carries a marker class,
//! `org.usvm.instrumentation.ConcolicHelper`, with a no-argument method
//! `breakpoint()`. Whenever the program calls it, the agent stops the
//! calling thread at the first bytecode of that method and runs a
//! [`RendezvousHook`](dispatcher::RendezvousHook).
//!
//! ## Running
//!
//! ```bash
//! cargo build --release
//! java -agentpath:./target/release/libconcolic_agent.so MyApp
//! java -agentpath:./target/release/libconcolic_agent.so=log=debug MyApp
//! ```
//!
//! See [`config`] for the accepted options.
//!
//! ## How it works
//!
//! ```text
//! Agent_OnLoad
//!   binding    GetEnv(JVMTI 1.2), AddCapabilities(can_generate_breakpoint_events)
//!   events     SetEventCallbacks, enable ClassPrepare + Breakpoint
//!
//! ClassPrepare (every class, any thread)
//!   watcher    signature == marker class?  no -> done
//!              first method named breakpoint with ()V
//!   resolver   record its jmethodID, SetBreakpoint(method, 0)
//!
//! Breakpoint (any thread)
//!   dispatcher method == recorded jmethodID?  yes -> RendezvousHook
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`sys::jni`], [`sys::jvmti`] | Raw FFI types and function tables |
//! | [`env`] | [`env::Jvmti`], the [`env::DebugInterface`] trait, RAII buffer guards |
//! | [`agent`] | [`ConcolicAgent`], the process-wide agent state |
//! | [`dispatcher`] | Breakpoint dispatch and the rendezvous hook |
//!
//! ## Custom hooks
//!
//! Disable the default `export` feature and export an agent with your own
//! hook:
//!
//! ```rust,ignore
//! use concolic_agent::{export_agent, ConcolicAgent};
//!
//! export_agent!(ConcolicAgent<MyHook>);
//! ```

pub mod sys;
pub mod env;

#[doc(hidden)]
pub mod jvmti_wrapper;

pub mod agent;
pub mod binding;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod prelude;
pub mod resolver;
pub mod watcher;

use std::sync::OnceLock;

pub use crate::agent::ConcolicAgent;
pub use crate::error::AgentError;
pub use crate::sys::jni;
use crate::env::Jvmti;
use crate::sys::jvmti;

/// A JVMTI agent driven by the events in [`events::callback_table`].
///
/// Implementations must be `Sync + Send`: the JVM delivers events on its
/// own threads, several at a time.
pub trait Agent: Sync + Send {
    /// Called from `Agent_OnLoad`.
    ///
    /// Return `JNI_OK` (0) on success, or `JNI_ERR` (-1) to abort JVM startup.
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint;

    /// Called from `Agent_OnUnload` during JVM shutdown.
    fn on_unload(&self) {}

    /// Called when a class is prepared (linked, methods queryable).
    fn class_prepare(&self, _jvmti: &Jvmti, _jni: *mut jni::JNIEnv, _thread: jni::jthread, _klass: jni::jclass) {}

    /// Called when a breakpoint is hit, before the instruction at
    /// `location` executes.
    fn breakpoint(
        &self,
        _jvmti: &Jvmti,
        _jni: *mut jni::JNIEnv,
        _thread: jni::jthread,
        _method: jni::jmethodID,
        _location: jvmti::jlocation,
    ) {
    }
}

// Holds the agent instance so the extern "system" trampolines can find it.
pub static GLOBAL_AGENT: OnceLock<Box<dyn Agent>> = OnceLock::new();

/// Register the process-wide agent. Fails if one is already registered.
pub fn set_global_agent(agent: Box<dyn Agent>) -> Result<(), ()> {
    GLOBAL_AGENT.set(agent).map_err(|_| ())
}

/// Exports an agent type as a loadable JVMTI agent library.
///
/// Generates `Agent_OnLoad`, which creates the agent with `Default`,
/// registers it in [`GLOBAL_AGENT`] and calls [`Agent::on_load`], and
/// `Agent_OnUnload`, which calls [`Agent::on_unload`].
///
/// The options string (everything after `=` in `-agentpath`) is passed to
/// `on_load` as-is; bytes that are not valid UTF-8 are replaced with
/// U+FFFD.
///
/// A second `Agent_OnLoad` in the same process returns `JNI_ERR`.
#[macro_export]
macro_rules! export_agent {
    ($agent_type:ty) => {
        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnLoad(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let agent = Box::new(<$agent_type>::default());
            if $crate::set_global_agent(agent).is_err() {
                return $crate::sys::jni::JNI_ERR;
            }

            let options = if options.is_null() {
                std::borrow::Cow::Borrowed("")
            } else {
                std::ffi::CStr::from_ptr(options).to_string_lossy()
            };

            match $crate::GLOBAL_AGENT.get() {
                Some(agent) => agent.on_load(vm, &options),
                None => $crate::sys::jni::JNI_ERR,
            }
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut $crate::sys::jni::JavaVM) {
            if let Some(agent) = $crate::GLOBAL_AGENT.get() {
                agent.on_unload();
            }
        }
    };
}

#[cfg(feature = "export")]
export_agent!(ConcolicAgent);
