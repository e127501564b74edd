//! Method resolver and breakpoint installer.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::env::DebugInterface;
use crate::error::JvmtiError;
use crate::sys::jni::jmethodID;
use crate::sys::jvmti::jlocation;

/// The resolved marker method, shared between the watcher (writer) and the
/// breakpoint dispatcher (reader).
///
/// Null means unset. The identity is stored with `Release` before the
/// breakpoint is requested, and loaded with `Acquire` by the dispatcher, so
/// any thread that hits the breakpoint observes it.
#[derive(Debug)]
pub struct TargetMethod(AtomicPtr<std::ffi::c_void>);

impl Default for TargetMethod {
    fn default() -> Self {
        Self::unset()
    }
}

impl TargetMethod {
    pub const fn unset() -> Self {
        Self(AtomicPtr::new(ptr::null_mut()))
    }

    pub fn get(&self) -> Option<jmethodID> {
        let method = self.0.load(Ordering::Acquire);
        (!method.is_null()).then_some(method)
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    /// True only for a set identity equal to `method`.
    pub fn matches(&self, method: jmethodID) -> bool {
        !method.is_null() && self.0.load(Ordering::Acquire) == method
    }

    /// Overwrites any previous identity.
    pub fn record(&self, method: jmethodID) {
        self.0.store(method, Ordering::Release);
    }
}

/// Record `method` as the target and set a breakpoint at `location`.
///
/// A rejected install (say `JVMTI_ERROR_DUPLICATE`) is handed back to the
/// caller; it is never retried.
pub fn install<D: DebugInterface + ?Sized>(
    iface: &D,
    target: &TargetMethod,
    method: jmethodID,
    location: jlocation,
) -> Result<(), JvmtiError> {
    target.record(method);
    iface.set_breakpoint(method, location)
}
