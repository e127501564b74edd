// concolic-agent/src/sys/jvmti.rs
//
// The slice of jvmti.h this agent calls into.
//
// The function table keeps the JDK slot layout (1-based slot numbers in the
// comments match jvmti.h). Slots the agent never calls are typed as
// `jvmtiUnusedFn` and grouped into arrays; the table is only ever read
// through a pointer the JVM owns, so it stops after the last slot we use
// (142, AddCapabilities).
//
// The event callback struct is likewise truncated after Breakpoint (62):
// SetEventCallbacks copies only `size_of_callbacks` bytes and clears the
// rest.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::fmt;
use std::os::raw::{c_char, c_uchar};
use crate::sys::jni::{jclass, jint, jlong, jmethodID, jthread, JNIEnv};

// --- Constants ---
pub const JVMTI_VERSION_1_0: jint = 0x30010000;
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

pub const JVMTI_EVENT_CLASS_PREPARE: u32 = 56;
pub const JVMTI_EVENT_BREAKPOINT: u32 = 62;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

pub type jlocation = jlong;

// --- Error Codes ---

/// A raw `jvmtiError` code.
///
/// Kept as a transparent newtype rather than an enum: the JVM may hand back
/// any code, and an out-of-range enum discriminant would be undefined
/// behaviour.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: Self = Self(0);
    pub const INVALID_THREAD: Self = Self(10);
    pub const INVALID_CLASS: Self = Self(21);
    pub const CLASS_NOT_PREPARED: Self = Self(22);
    pub const INVALID_METHODID: Self = Self(23);
    pub const INVALID_LOCATION: Self = Self(24);
    pub const DUPLICATE: Self = Self(40);
    pub const NOT_FOUND: Self = Self(41);
    pub const NOT_AVAILABLE: Self = Self(98);
    pub const MUST_POSSESS_CAPABILITY: Self = Self(99);
    pub const NULL_POINTER: Self = Self(100);
    pub const ABSENT_INFORMATION: Self = Self(101);
    pub const INVALID_EVENT_TYPE: Self = Self(102);
    pub const ILLEGAL_ARGUMENT: Self = Self(103);
    pub const NATIVE_METHOD: Self = Self(104);
    pub const OUT_OF_MEMORY: Self = Self(110);
    pub const ACCESS_DENIED: Self = Self(111);
    pub const WRONG_PHASE: Self = Self(112);
    pub const INTERNAL: Self = Self(113);
    pub const UNATTACHED_THREAD: Self = Self(115);
    pub const INVALID_ENVIRONMENT: Self = Self(116);

    /// The `JVMTI_ERROR_*` suffix for codes this crate knows about.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "NONE",
            10 => "INVALID_THREAD",
            21 => "INVALID_CLASS",
            22 => "CLASS_NOT_PREPARED",
            23 => "INVALID_METHODID",
            24 => "INVALID_LOCATION",
            40 => "DUPLICATE",
            41 => "NOT_FOUND",
            98 => "NOT_AVAILABLE",
            99 => "MUST_POSSESS_CAPABILITY",
            100 => "NULL_POINTER",
            101 => "ABSENT_INFORMATION",
            102 => "INVALID_EVENT_TYPE",
            103 => "ILLEGAL_ARGUMENT",
            104 => "NATIVE_METHOD",
            110 => "OUT_OF_MEMORY",
            111 => "ACCESS_DENIED",
            112 => "WRONG_PHASE",
            113 => "INTERNAL",
            115 => "UNATTACHED_THREAD",
            116 => "INVALID_ENVIRONMENT",
            _ => return None,
        };
        Some(name)
    }

    pub fn is_ok(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "JVMTI_ERROR_{} ({})", name, self.0),
            None => write!(f, "JVMTI error {}", self.0),
        }
    }
}

impl fmt::Debug for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for jvmtiError {}

// --- Capabilities ---
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl jvmtiCapabilities {
    fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        if value {
            self.bits[word_index] |= 1 << bit_index;
        } else {
            self.bits[word_index] &= !(1 << bit_index);
        }
    }

    fn get_bit(&self, bit_offset: usize) -> bool {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        (self.bits[word_index] & (1 << bit_index)) != 0
    }

    // [19]
    pub fn set_can_generate_breakpoint_events(&mut self, v: bool) { self.set_bit(19, v); }
    pub fn can_generate_breakpoint_events(&self) -> bool { self.get_bit(19) }

    /// True if no capability bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }
}

impl fmt::Display for jvmtiCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities [")?;
        if self.can_generate_breakpoint_events() { write!(f, "Breakpoint ")?; }
        write!(f, "]")
    }
}

// =========================================================================
// FUNCTION TYPEDEFS: INTERFACE
// =========================================================================

pub type jvmtiUnusedFn = Option<unsafe extern "system" fn()>;

pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mode: jint, event_type: u32, event_thread: jthread) -> jvmtiError;
pub type JvmtiSetBreakpointFn = unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, location: jlocation) -> jvmtiError;
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;
pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetClassMethodsFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, method_count_ptr: *mut jint, methods_ptr: *mut *mut jmethodID) -> jvmtiError;
pub type JvmtiGetMethodNameFn = unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, name_ptr: *mut *mut c_char, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(env: *mut jvmtiEnv, callbacks: *const jvmtiEventCallbacks, size_of_callbacks: jint) -> jvmtiError;
pub type JvmtiAddCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError;

// =========================================================================
// FUNCTION TYPEDEFS: EVENT CALLBACKS
// =========================================================================

pub type jvmtiEventReserved = Option<unsafe extern "system" fn()>;

pub type JvmtiClassPrepareFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    klass: jclass
);

pub type JvmtiBreakpointFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    location: jlocation
);

#[repr(C)]
#[derive(Copy, Clone)]
pub struct jvmtiInterface_1_ {
    /*   1:  RESERVED */
    pub reserved1: jvmtiUnusedFn,
    /*   2: Set Event Notification Mode */
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,
    /*   3-37: threads, frames, locals, raw monitors */
    pub unused_3_37: [jvmtiUnusedFn; 35],
    /*   38: Set Breakpoint */
    pub SetBreakpoint: Option<JvmtiSetBreakpointFn>,
    /*   39-46: ClearBreakpoint .. Allocate */
    pub unused_39_46: [jvmtiUnusedFn; 8],
    /*   47: Deallocate */
    pub Deallocate: Option<JvmtiDeallocateFn>,
    /*   48: Get Class Signature */
    pub GetClassSignature: Option<JvmtiGetClassSignatureFn>,
    /*   49-51: GetClassStatus .. GetClassModifiers */
    pub unused_49_51: [jvmtiUnusedFn; 3],
    /*   52: Get Class Methods */
    pub GetClassMethods: Option<JvmtiGetClassMethodsFn>,
    /*   53-63: fields, interfaces, object info */
    pub unused_53_63: [jvmtiUnusedFn; 11],
    /*   64: Get Method Name (and Signature) */
    pub GetMethodName: Option<JvmtiGetMethodNameFn>,
    /*   65-121: method details, heap, stack traces, JNI table */
    pub unused_65_121: [jvmtiUnusedFn; 57],
    /*   122: Set Event Callbacks */
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,
    /*   123-141: extensions, properties, timers, potential capabilities */
    pub unused_123_141: [jvmtiUnusedFn; 19],
    /*   142: Add Capabilities */
    pub AddCapabilities: Option<JvmtiAddCapabilitiesFn>,
}

impl Default for jvmtiInterface_1_ {
    fn default() -> Self {
        Self {
            reserved1: None,
            SetEventNotificationMode: None,
            unused_3_37: [None; 35],
            SetBreakpoint: None,
            unused_39_46: [None; 8],
            Deallocate: None,
            GetClassSignature: None,
            unused_49_51: [None; 3],
            GetClassMethods: None,
            unused_53_63: [None; 11],
            GetMethodName: None,
            unused_65_121: [None; 57],
            SetEventCallbacks: None,
            unused_123_141: [None; 19],
            AddCapabilities: None,
        }
    }
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct jvmtiEventCallbacks {
    /*   50-55: VMInit .. ClassLoad */
    pub unused_50_55: [jvmtiEventReserved; 6],
    /*   56 */
    pub ClassPrepare: Option<JvmtiClassPrepareFn>,
    /*   57-61: VMStart .. FramePop */
    pub unused_57_61: [jvmtiEventReserved; 5],
    /*   62 */
    pub Breakpoint: Option<JvmtiBreakpointFn>,
}
