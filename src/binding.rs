//! Debug-interface binding: the one-shot startup handshake with the JVM.

use crate::env::{DebugInterface, Jvmti};
use crate::error::{AgentError, Result};
use crate::sys::{jni, jvmti};

/// Obtain the JVMTI environment (`JVMTI_VERSION_1_2`) from `vm`.
pub fn bind(vm: *mut jni::JavaVM) -> Result<Jvmti> {
    Jvmti::with_version(vm, jvmti::JVMTI_VERSION_1_2).map_err(AgentError::EnvUnavailable)
}

/// The capability set the agent needs: breakpoint events, nothing else.
pub fn required_capabilities() -> jvmti::jvmtiCapabilities {
    let mut caps = jvmti::jvmtiCapabilities::default();
    caps.set_can_generate_breakpoint_events(true);
    caps
}

pub fn request_capabilities<D: DebugInterface + ?Sized>(iface: &D) -> Result<()> {
    let caps = required_capabilities();
    log::debug!("requesting {}", caps);
    iface.add_capabilities(&caps).map_err(AgentError::Capabilities)
}
