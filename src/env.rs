//! High-level view of the JVMTI environment.
//!
//! The watcher, resolver and event registration are written against the
//! [`DebugInterface`] trait rather than against the raw `jvmtiEnv` pointer.
//! [`Jvmti`] is the real implementation; the test suite plugs in a mock.
//!
//! # Interface-owned memory
//!
//! JVMTI hands out class signatures, method names and method tables in
//! buffers it allocated, and the agent must give each of them back through
//! `Deallocate` exactly once. The guards in this module own such a buffer
//! for as long as they live and release it when dropped, so every exit path
//! of a callback (early return, `?`, `break`) releases what it borrowed:
//!
//! - [`JvmtiString`]: a NUL-terminated modified-UTF-8 string
//! - [`JvmtiArray`]: a counted array such as the `jmethodID`s of a class
//! - [`MethodName`]: the name and signature pair of one method
//!
//! ```rust,ignore
//! fn is_marker<D: DebugInterface>(iface: &D, klass: jni::jclass) -> bool {
//!     match iface.get_class_signature(klass) {
//!         // the signature buffer is deallocated when `sig` goes out of scope
//!         Ok(sig) => sig.is("Lorg/usvm/instrumentation/ConcolicHelper;"),
//!         Err(_) => false,
//!     }
//! }
//! ```

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::c_char;

use crate::sys::jni::{jclass, jmethodID, jthread};
use crate::sys::jvmti::{jlocation, jvmtiCapabilities, jvmtiError, jvmtiEventCallbacks};

pub use crate::jvmti_wrapper::Jvmti;

/// The JVMTI operations the agent relies on.
///
/// Every method mirrors one JVMTI function. Methods that return
/// interface-owned memory hand it back wrapped in a guard that calls
/// [`DebugInterface::deallocate`] on drop.
pub trait DebugInterface {
    fn add_capabilities(&self, caps: &jvmtiCapabilities) -> Result<(), jvmtiError>;

    fn set_event_callbacks(&self, callbacks: &jvmtiEventCallbacks) -> Result<(), jvmtiError>;

    /// `thread` may be null, meaning all threads.
    fn set_event_notification_mode(
        &self,
        enable: bool,
        event_type: u32,
        thread: jthread,
    ) -> Result<(), jvmtiError>;

    /// The JVM signature of `klass`, e.g. `Ljava/lang/String;`.
    fn get_class_signature(&self, klass: jclass) -> Result<JvmtiString<'_, Self>, jvmtiError>;

    /// The methods declared by `klass`, in the order the JVM reports them.
    fn get_class_methods(&self, klass: jclass) -> Result<JvmtiArray<'_, Self, jmethodID>, jvmtiError>;

    /// Name and signature of `method`. The generic signature is not requested.
    fn get_method_name(&self, method: jmethodID) -> Result<MethodName<'_, Self>, jvmtiError>;

    fn set_breakpoint(&self, method: jmethodID, location: jlocation) -> Result<(), jvmtiError>;

    /// Releases a buffer previously returned by this interface. Null is a no-op.
    fn deallocate(&self, mem: *mut u8) -> Result<(), jvmtiError>;
}

/// A string allocated by the debug interface.
pub struct JvmtiString<'a, D: DebugInterface + ?Sized> {
    iface: &'a D,
    ptr: *mut c_char,
}

impl<'a, D: DebugInterface + ?Sized> JvmtiString<'a, D> {
    /// Takes ownership of `ptr`.
    ///
    /// # Safety
    /// `ptr` must be null or a NUL-terminated buffer allocated by `iface`
    /// that nobody else will deallocate.
    pub unsafe fn from_raw(iface: &'a D, ptr: *mut c_char) -> Self {
        Self { iface, ptr }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn as_c_str(&self) -> Option<&CStr> {
        if self.ptr.is_null() {
            None
        } else {
            // SAFETY: non-null, NUL-terminated per `from_raw`, alive until drop
            Some(unsafe { CStr::from_ptr(self.ptr) })
        }
    }

    /// Exact, case-sensitive comparison of the raw bytes.
    pub fn is(&self, expected: &str) -> bool {
        self.as_c_str()
            .map_or(false, |s| s.to_bytes() == expected.as_bytes())
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self.as_c_str() {
            Some(s) => s.to_string_lossy(),
            None => Cow::Borrowed("<null>"),
        }
    }
}

impl<D: DebugInterface + ?Sized> Drop for JvmtiString<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.iface.deallocate(self.ptr.cast()) {
            log::warn!("failed to deallocate JVMTI string: {}", e);
        }
    }
}

/// A counted array allocated by the debug interface.
pub struct JvmtiArray<'a, D: DebugInterface + ?Sized, T: Copy> {
    iface: &'a D,
    ptr: *mut T,
    len: usize,
}

impl<'a, D: DebugInterface + ?Sized, T: Copy> JvmtiArray<'a, D, T> {
    /// Takes ownership of `ptr`.
    ///
    /// # Safety
    /// `ptr` must be null or point to `len` initialised elements allocated
    /// by `iface` that nobody else will deallocate.
    pub unsafe fn from_raw(iface: &'a D, ptr: *mut T, len: usize) -> Self {
        Self { iface, ptr, len }
    }

    pub fn as_slice(&self) -> &[T] {
        if self.ptr.is_null() || self.len == 0 {
            &[]
        } else {
            // SAFETY: `len` initialised elements per `from_raw`, alive until drop
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<D: DebugInterface + ?Sized, T: Copy> Drop for JvmtiArray<'_, D, T> {
    fn drop(&mut self) {
        if let Err(e) = self.iface.deallocate(self.ptr.cast()) {
            log::warn!("failed to deallocate JVMTI array: {}", e);
        }
    }
}

/// Name and signature of one method, both interface-owned.
pub struct MethodName<'a, D: DebugInterface + ?Sized> {
    pub name: JvmtiString<'a, D>,
    pub signature: JvmtiString<'a, D>,
}

impl<D: DebugInterface + ?Sized> MethodName<'_, D> {
    pub fn matches(&self, name: &str, signature: &str) -> bool {
        self.name.is(name) && self.signature.is(signature)
    }
}
