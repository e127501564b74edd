//! Common imports for embedding the agent with a custom hook.

pub use crate::agent::ConcolicAgent;
pub use crate::dispatcher::{Rendezvous, RendezvousHook};
pub use crate::env::{DebugInterface, Jvmti};
pub use crate::export_agent;
pub use crate::sys::{jni, jvmti};
pub use crate::Agent;
