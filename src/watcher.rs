//! Class-load watcher.
//!
//! Runs on every `ClassPrepare` event. Almost every call is for some other
//! class and ends after one signature comparison; only the marker class gets
//! its methods enumerated.

use crate::config::TargetSpec;
use crate::env::DebugInterface;
use crate::error::JvmtiError;
use crate::resolver::{self, TargetMethod};
use crate::sys::jni::{jclass, jmethodID};

/// What one `ClassPrepare` callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Some other class; nothing enumerated.
    NotTarget,
    /// The marker class has no method with the marker name and `()V`.
    MethodNotFound,
    /// Breakpoint set on this method.
    Installed(jmethodID),
    /// The marker method was found but `SetBreakpoint` refused it.
    InstallFailed(jmethodID, JvmtiError),
    /// The class signature or method table could not be read.
    Unreadable(JvmtiError),
}

/// Handle one prepared class.
///
/// Nothing here is fatal: every failure is logged and reported through the
/// returned [`WatchOutcome`], and the program keeps running.
pub fn on_class_prepare<D: DebugInterface + ?Sized>(
    iface: &D,
    klass: jclass,
    spec: &TargetSpec,
    target: &TargetMethod,
) -> WatchOutcome {
    match is_target_class(iface, klass, spec) {
        Ok(true) => {}
        Ok(false) => return WatchOutcome::NotTarget,
        Err(e) => {
            log::debug!("unable to read class signature: {}", e);
            return WatchOutcome::Unreadable(e);
        }
    }
    log::info!("class {} prepared", spec.class_signature());

    let method = match find_method(iface, klass, spec) {
        Ok(Some(method)) => method,
        Ok(None) => {
            log::warn!(
                "{} has no method {}{}, no breakpoint installed",
                spec.class_signature(),
                spec.method_name(),
                spec.method_signature()
            );
            return WatchOutcome::MethodNotFound;
        }
        Err(e) => {
            log::warn!("unable to list methods of {}: {}", spec.class_signature(), e);
            return WatchOutcome::Unreadable(e);
        }
    };
    log::info!("found {}{}", spec.method_name(), spec.method_signature());

    match resolver::install(iface, target, method, spec.location()) {
        Ok(()) => {
            log::info!("breakpoint set at {}{}:{}", spec.method_name(), spec.method_signature(), spec.location());
            WatchOutcome::Installed(method)
        }
        Err(e) => {
            log::warn!("unable to set breakpoint on {}: {}", spec.method_name(), e);
            WatchOutcome::InstallFailed(method, e)
        }
    }
}

/// Compare the class signature with the target; the signature buffer is
/// released before this returns.
pub fn is_target_class<D: DebugInterface + ?Sized>(
    iface: &D,
    klass: jclass,
    spec: &TargetSpec,
) -> Result<bool, JvmtiError> {
    let signature = iface.get_class_signature(klass)?;
    Ok(signature.is(spec.class_signature()))
}

/// First method of `klass`, in JVM order, whose name and signature match.
///
/// Methods after the match are not examined. Every name/signature pair read
/// is released before the next one is fetched, and the method table itself
/// is released on return.
pub fn find_method<D: DebugInterface + ?Sized>(
    iface: &D,
    klass: jclass,
    spec: &TargetSpec,
) -> Result<Option<jmethodID>, JvmtiError> {
    let methods = iface.get_class_methods(klass)?;

    for &method in methods.as_slice() {
        let matched = match iface.get_method_name(method) {
            Ok(desc) => desc.matches(spec.method_name(), spec.method_signature()),
            Err(e) => {
                log::debug!("skipping method {:?}: {}", method, e);
                false
            }
        };
        if matched {
            return Ok(Some(method));
        }
    }
    Ok(None)
}
