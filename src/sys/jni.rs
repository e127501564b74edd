// concolic-agent/src/sys/jni.rs
//
// The slice of jni.h a JVMTI agent needs: primitive and reference types,
// status codes, and the JavaVM invocation table (for GetEnv).
//
// JNIEnv is only ever passed through to the rendezvous hook, so its
// function table is kept opaque.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;

// =============================================================================
// Reference and ID Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jthread = jobject;

pub type jmethodID = *mut c_void;

// =============================================================================
// Constants
// =============================================================================

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;
pub const JNI_EVERSION: jint = -3;

// =============================================================================
// JNIEnv - opaque
// =============================================================================

#[repr(C)]
pub struct JNINativeInterface_ {
    _private: [u8; 0],
}

pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - The JavaVM function table
// =============================================================================

pub type JniGetEnvFn =
    unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint;
pub type JniVmFn = unsafe extern "system" fn(vm: *mut JavaVM) -> jint;
pub type JniAttachFn =
    unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint;

#[repr(C)]
pub struct JNIInvokeInterface_ {
    pub reserved0: *mut c_void,
    pub reserved1: *mut c_void,
    pub reserved2: *mut c_void,

    pub DestroyJavaVM: Option<JniVmFn>,
    pub AttachCurrentThread: Option<JniAttachFn>,
    pub DetachCurrentThread: Option<JniVmFn>,
    pub GetEnv: Option<JniGetEnvFn>,
    pub AttachCurrentThreadAsDaemon: Option<JniAttachFn>,
}

// In C, JavaVM is the vtable pointer itself:
//   typedef const struct JNIInvokeInterface_ *JavaVM;
pub type JavaVM = *const JNIInvokeInterface_;
