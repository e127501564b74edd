//! Breakpoint dispatcher and the rendezvous hook.
//!
//! Every `Breakpoint` event the JVM delivers lands in
//! [`BreakpointDispatcher::dispatch`]. Only a hit on the recorded marker
//! method reaches the hook; anything else is dropped without a diagnostic
//! above trace level.
//!
//! The hook runs synchronously on the thread that called the marker method,
//! before the method body executes. That thread is stopped for exactly as
//! long as the hook takes. A panic in the hook is caught and logged here;
//! it never unwinds into the JVM.
//!
//! Dispatch changes no agent state. The one thing it writes is the hit
//! counter, which only feeds `Rendezvous::sequence` and diagnostics.
//!
//! ```rust,ignore
//! use concolic_agent::dispatcher::{Rendezvous, RendezvousHook};
//!
//! #[derive(Default)]
//! struct Snapshot;
//!
//! impl RendezvousHook for Snapshot {
//!     fn on_rendezvous(&self, point: &Rendezvous) {
//!         // inspect the stopped thread through point.jni / point.thread
//!     }
//! }
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::resolver::TargetMethod;
use crate::sys::jni::{jmethodID, jthread, JNIEnv};
use crate::sys::jvmti::jlocation;

/// One arrival at the rendezvous point.
#[derive(Debug, Clone, Copy)]
pub struct Rendezvous {
    /// JNI environment of the stopped thread, valid for the duration of the hook.
    pub jni: *mut JNIEnv,
    pub thread: jthread,
    pub method: jmethodID,
    pub location: jlocation,
    /// 1 for the first hit in the process, counting every thread.
    pub sequence: u64,
}

/// Extension point invoked at every rendezvous.
///
/// May run on several threads at once. A panic is caught by the
/// dispatcher, and the JVM thread carries on into the marker method.
pub trait RendezvousHook: Send + Sync {
    fn on_rendezvous(&self, point: &Rendezvous);
}

/// Logs each hit and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHook;

impl RendezvousHook for LoggingHook {
    fn on_rendezvous(&self, point: &Rendezvous) {
        log::info!(
            "breakpoint hit #{} (thread {:?}, location {})",
            point.sequence,
            point.thread,
            point.location
        );
    }
}

/// What one `Breakpoint` event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The hook ran; carries the hit's sequence number.
    Rendezvous(u64),
    /// The hook ran and panicked.
    HookPanicked(u64),
    /// Not the marker method, or nothing recorded yet.
    Ignored,
}

/// Compares breakpoint hits against the recorded target and forwards
/// matches to the hook.
#[derive(Debug, Default)]
pub struct BreakpointDispatcher<H> {
    hook: H,
    hits: AtomicU64,
}

impl<H: RendezvousHook> BreakpointDispatcher<H> {
    pub fn new(hook: H) -> Self {
        Self {
            hook,
            hits: AtomicU64::new(0),
        }
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn dispatch(
        &self,
        target: &TargetMethod,
        jni: *mut JNIEnv,
        thread: jthread,
        method: jmethodID,
        location: jlocation,
    ) -> Dispatch {
        if !target.matches(method) {
            log::trace!("ignoring breakpoint in {:?} at {}", method, location);
            return Dispatch::Ignored;
        }

        let sequence = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
        let point = Rendezvous {
            jni,
            thread,
            method,
            location,
            sequence,
        };
        match catch_unwind(AssertUnwindSafe(|| self.hook.on_rendezvous(&point))) {
            Ok(()) => Dispatch::Rendezvous(sequence),
            Err(_) => {
                log::error!("rendezvous hook panicked on hit #{}", sequence);
                Dispatch::HookPanicked(sequence)
            }
        }
    }

    /// Hits that reached the hook so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}
