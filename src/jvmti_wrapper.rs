// concolic-agent/src/jvmti_wrapper.rs
use crate::env::{DebugInterface, JvmtiArray, JvmtiString, MethodName};
use crate::sys::jni;
use crate::sys::jvmti;
use std::os::raw::c_char;
use std::ptr;

/// A safe wrapper around the raw JVMTI Environment pointer.
///
/// The JVM passes the same environment to every event callback, so the
/// trampolines rebuild a `Jvmti` from the callback argument instead of
/// keeping a copy in global state.
#[derive(Debug, Clone, Copy)]
pub struct Jvmti {
    env: *mut jvmti::jvmtiEnv,
}

// SAFETY: unlike JNIEnv, a jvmtiEnv pointer is not thread-local; JVMTI
// allows it to be used from any thread for the lifetime of the agent.
unsafe impl Send for Jvmti {}
unsafe impl Sync for Jvmti {}

impl Jvmti {
    /// Connects to the JVM and retrieves the JVMTI environment.
    ///
    /// Returns the `GetEnv` status on failure, or `JNI_ERR` when the VM
    /// pointer, its GetEnv entry, or the returned environment is null.
    pub fn new(vm: *mut jni::JavaVM) -> Result<Self, jni::jint> {
        Self::with_version(vm, jvmti::JVMTI_VERSION_1_2)
    }

    pub fn with_version(vm: *mut jni::JavaVM, version: jni::jint) -> Result<Self, jni::jint> {
        if vm.is_null() {
            return Err(jni::JNI_ERR);
        }
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();

        unsafe {
            // vm: *mut JavaVM = *mut *const JNIInvokeInterface_
            let functions = *vm;
            if functions.is_null() {
                return Err(jni::JNI_ERR);
            }
            let get_env_fn = (*functions).GetEnv.ok_or(jni::JNI_ERR)?;

            let res = get_env_fn(vm, &mut env_ptr, version);
            if res != jni::JNI_OK {
                return Err(res);
            }
        }

        if env_ptr.is_null() {
            return Err(jni::JNI_ERR);
        }

        Ok(Jvmti {
            env: env_ptr as *mut jvmti::jvmtiEnv,
        })
    }

    /// Create a Jvmti wrapper from a raw jvmtiEnv pointer
    ///
    /// # Safety
    /// The caller must ensure the pointer is valid for the duration of use.
    pub unsafe fn from_raw(env: *mut jvmti::jvmtiEnv) -> Self {
        Jvmti { env }
    }

    /// Get the raw jvmtiEnv pointer
    pub fn raw(&self) -> *mut jvmti::jvmtiEnv {
        self.env
    }

    fn functions(&self) -> Result<&jvmti::jvmtiInterface_1_, jvmti::jvmtiError> {
        if self.env.is_null() {
            return Err(jvmti::jvmtiError::INVALID_ENVIRONMENT);
        }
        unsafe {
            let functions = (*self.env).functions;
            if functions.is_null() {
                return Err(jvmti::jvmtiError::INVALID_ENVIRONMENT);
            }
            Ok(&*functions)
        }
    }
}

fn check(err: jvmti::jvmtiError) -> Result<(), jvmti::jvmtiError> {
    if err.is_ok() { Ok(()) } else { Err(err) }
}

impl DebugInterface for Jvmti {
    fn add_capabilities(&self, new_caps: &jvmti::jvmtiCapabilities) -> Result<(), jvmti::jvmtiError> {
        // slot 142
        let add_caps_fn = self.functions()?.AddCapabilities.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        check(unsafe { add_caps_fn(self.env, new_caps) })
    }

    fn set_event_callbacks(&self, callbacks: &jvmti::jvmtiEventCallbacks) -> Result<(), jvmti::jvmtiError> {
        let set_callbacks_fn = self.functions()?.SetEventCallbacks.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        let size = std::mem::size_of::<jvmti::jvmtiEventCallbacks>() as jni::jint;
        check(unsafe { set_callbacks_fn(self.env, callbacks, size) })
    }

    fn set_event_notification_mode(&self, enable: bool, event_type: u32, thread: jni::jthread) -> Result<(), jvmti::jvmtiError> {
        let set_mode_fn = self.functions()?.SetEventNotificationMode.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        let mode = if enable { jvmti::JVMTI_ENABLE } else { jvmti::JVMTI_DISABLE };
        check(unsafe { set_mode_fn(self.env, mode, event_type, thread) })
    }

    fn get_class_signature(&self, klass: jni::jclass) -> Result<JvmtiString<'_, Self>, jvmti::jvmtiError> {
        let get_class_sig_fn = self.functions()?.GetClassSignature.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        let mut sig_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            check(get_class_sig_fn(self.env, klass, &mut sig_ptr, ptr::null_mut()))?;
            Ok(JvmtiString::from_raw(self, sig_ptr))
        }
    }

    fn get_class_methods(&self, klass: jni::jclass) -> Result<JvmtiArray<'_, Self, jni::jmethodID>, jvmti::jvmtiError> {
        let get_fn = self.functions()?.GetClassMethods.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        let mut method_count: jni::jint = 0;
        let mut methods_ptr: *mut jni::jmethodID = ptr::null_mut();

        unsafe {
            check(get_fn(self.env, klass, &mut method_count, &mut methods_ptr))?;
            Ok(JvmtiArray::from_raw(self, methods_ptr, method_count.max(0) as usize))
        }
    }

    fn get_method_name(&self, method: jni::jmethodID) -> Result<MethodName<'_, Self>, jvmti::jvmtiError> {
        let get_method_name_fn = self.functions()?.GetMethodName.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        let mut name_ptr: *mut c_char = ptr::null_mut();
        let mut sig_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            check(get_method_name_fn(self.env, method, &mut name_ptr, &mut sig_ptr, ptr::null_mut()))?;
            Ok(MethodName {
                name: JvmtiString::from_raw(self, name_ptr),
                signature: JvmtiString::from_raw(self, sig_ptr),
            })
        }
    }

    fn set_breakpoint(&self, method: jni::jmethodID, location: jvmti::jlocation) -> Result<(), jvmti::jvmtiError> {
        // slot 38
        let set_fn = self.functions()?.SetBreakpoint.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        check(unsafe { set_fn(self.env, method, location) })
    }

    fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        let deallocate_fn = self.functions()?.Deallocate.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        check(unsafe { deallocate_fn(self.env, mem) })
    }
}
