//! Process-wide installation state.
//!
//! ```text
//! Unbound -> InterfaceBound -> Watching -> Installed
//! ```
//!
//! The phase only moves forward. `Installed` is terminal for the
//! installation protocol; class-prepare events keep arriving afterwards and
//! breakpoint hits are only possible once it has been reached.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgentPhase {
    /// Nothing acquired yet.
    Unbound = 0,
    /// JVMTI environment and breakpoint capability obtained.
    InterfaceBound = 1,
    /// Callbacks registered, ClassPrepare and Breakpoint enabled.
    Watching = 2,
    /// Breakpoint set on the marker method.
    Installed = 3,
}

impl AgentPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => AgentPhase::Unbound,
            1 => AgentPhase::InterfaceBound,
            2 => AgentPhase::Watching,
            _ => AgentPhase::Installed,
        }
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::Unbound => "UNBOUND",
            AgentPhase::InterfaceBound => "INTERFACE_BOUND",
            AgentPhase::Watching => "WATCHING",
            AgentPhase::Installed => "INSTALLED",
        };
        f.write_str(name)
    }
}

/// Atomic holder for the current [`AgentPhase`].
#[derive(Debug)]
pub struct PhaseCell(AtomicU8);

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(AgentPhase::Unbound as u8))
    }

    pub fn get(&self) -> AgentPhase {
        AgentPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `to` unless the phase is already there or beyond.
    /// Returns true if this call made the transition.
    pub fn advance(&self, to: AgentPhase) -> bool {
        self.0.fetch_max(to as u8, Ordering::AcqRel) < to as u8
    }
}
