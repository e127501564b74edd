//! Test doubles for the JVMTI surface.
//!
//! `MockInterface` implements `DebugInterface` over an in-memory class
//! table and hands out real heap buffers, recording every allocation and
//! every `Deallocate` so tests can check that nothing leaks or is freed
//! twice. `FakeJvm` wraps the same mock behind genuine `JavaVM` and
//! `jvmtiEnv` function tables for tests that go through the FFI layer.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_uchar};
use std::ptr;
use std::sync::Mutex;

use concolic_agent::env::{DebugInterface, JvmtiArray, JvmtiString, MethodName};
use concolic_agent::sys::jni::{self, jclass, jint, jmethodID, jthread, JavaVM, JNIInvokeInterface_};
use concolic_agent::sys::jvmti::{
    jlocation, jvmtiCapabilities, jvmtiEnv, jvmtiError, jvmtiEventCallbacks, jvmtiInterface_1_,
    JVMTI_DISABLE, JVMTI_ENABLE, JVMTI_VERSION_1_0, JVMTI_VERSION_1_2,
};

struct MockClass {
    signature: String,
    methods: Vec<(String, String)>,
}

/// Owned backing memory for a buffer handed out by the mock.
enum Buffer {
    Str(CString),
    Methods(Vec<usize>),
}

#[derive(Default)]
struct MockState {
    live: HashMap<usize, Buffer>,
    allocations: usize,
    deallocations: usize,
    bad_frees: usize,
    signature_reads: usize,
    method_table_reads: usize,
    method_name_reads: usize,
    capabilities: Vec<jvmtiCapabilities>,
    callbacks: Option<jvmtiEventCallbacks>,
    enabled: Vec<u32>,
    breakpoint_attempts: usize,
    breakpoints: Vec<(usize, jlocation)>,
}

#[derive(Default)]
pub struct MockInterface {
    classes: Vec<MockClass>,
    unreadable_methods: HashSet<usize>,
    unreadable_classes: HashSet<usize>,
    reject_capabilities: Option<jvmtiError>,
    reject_callbacks: Option<jvmtiError>,
    reject_events: HashMap<u32, jvmtiError>,
    reject_breakpoints: Option<jvmtiError>,
    state: Mutex<MockState>,
}

impl MockInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a prepared class. Method ids follow declaration order.
    pub fn add_class(&mut self, signature: &str, methods: &[(&str, &str)]) -> jclass {
        self.classes.push(MockClass {
            signature: signature.to_string(),
            methods: methods
                .iter()
                .map(|(name, sig)| (name.to_string(), sig.to_string()))
                .collect(),
        });
        self.classes.len() as jclass
    }

    pub fn method(&self, klass: jclass, index: usize) -> jmethodID {
        method_id(klass as usize, index) as jmethodID
    }

    pub fn unreadable_method(&mut self, method: jmethodID) {
        self.unreadable_methods.insert(method as usize);
    }

    /// Make `GetClassMethods` fail for `klass`.
    pub fn unreadable_class(&mut self, klass: jclass) {
        self.unreadable_classes.insert(klass as usize);
    }

    pub fn reject_capabilities(&mut self, error: jvmtiError) {
        self.reject_capabilities = Some(error);
    }

    pub fn reject_callbacks(&mut self, error: jvmtiError) {
        self.reject_callbacks = Some(error);
    }

    pub fn reject_event(&mut self, event: u32, error: jvmtiError) {
        self.reject_events.insert(event, error);
    }

    pub fn reject_breakpoints(&mut self, error: jvmtiError) {
        self.reject_breakpoints = Some(error);
    }

    // --- observation ---

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Buffers handed out and not yet deallocated.
    pub fn outstanding(&self) -> usize {
        self.state().live.len()
    }

    pub fn allocations(&self) -> usize {
        self.state().allocations
    }

    pub fn deallocations(&self) -> usize {
        self.state().deallocations
    }

    /// `Deallocate` calls on pointers the mock never handed out (or already
    /// took back).
    pub fn bad_frees(&self) -> usize {
        self.state().bad_frees
    }

    pub fn signature_reads(&self) -> usize {
        self.state().signature_reads
    }

    pub fn method_table_reads(&self) -> usize {
        self.state().method_table_reads
    }

    pub fn method_name_reads(&self) -> usize {
        self.state().method_name_reads
    }

    pub fn capabilities(&self) -> Vec<jvmtiCapabilities> {
        self.state().capabilities.clone()
    }

    pub fn callbacks(&self) -> Option<jvmtiEventCallbacks> {
        self.state().callbacks
    }

    pub fn enabled_events(&self) -> Vec<u32> {
        self.state().enabled.clone()
    }

    pub fn breakpoint_attempts(&self) -> usize {
        self.state().breakpoint_attempts
    }

    pub fn breakpoints(&self) -> Vec<(jmethodID, jlocation)> {
        self.state()
            .breakpoints
            .iter()
            .map(|&(method, location)| (method as jmethodID, location))
            .collect()
    }

    // --- raw operations, shared by the trait impl and the FFI table ---

    fn class(&self, klass: jclass) -> Option<&MockClass> {
        (klass as usize).checked_sub(1).and_then(|i| self.classes.get(i))
    }

    fn method_desc(&self, method: jmethodID) -> Option<&(String, String)> {
        let raw = method as usize;
        self.class((raw >> 16) as jclass)
            .and_then(|class| (raw & 0xffff).checked_sub(1).and_then(|i| class.methods.get(i)))
    }

    fn alloc_str(&self, value: &str) -> *mut c_char {
        let value = CString::new(value).unwrap();
        let ptr = value.as_ptr() as *mut c_char;
        let mut state = self.state();
        state.live.insert(ptr as usize, Buffer::Str(value));
        state.allocations += 1;
        ptr
    }

    pub fn raw_add_capabilities(&self, caps: &jvmtiCapabilities) -> jvmtiError {
        if let Some(error) = self.reject_capabilities {
            return error;
        }
        self.state().capabilities.push(*caps);
        jvmtiError::NONE
    }

    pub fn raw_set_event_callbacks(&self, callbacks: &jvmtiEventCallbacks) -> jvmtiError {
        if let Some(error) = self.reject_callbacks {
            return error;
        }
        self.state().callbacks = Some(*callbacks);
        jvmtiError::NONE
    }

    pub fn raw_set_event_notification_mode(&self, mode: jint, event: u32, thread: jthread) -> jvmtiError {
        if let Some(&error) = self.reject_events.get(&event) {
            return error;
        }
        // the agent only ever enables events globally
        if mode != JVMTI_ENABLE || !thread.is_null() {
            return jvmtiError::ILLEGAL_ARGUMENT;
        }
        self.state().enabled.push(event);
        jvmtiError::NONE
    }

    pub fn raw_class_signature(&self, klass: jclass) -> Result<*mut c_char, jvmtiError> {
        self.state().signature_reads += 1;
        let class = self.class(klass).ok_or(jvmtiError::INVALID_CLASS)?;
        Ok(self.alloc_str(&class.signature))
    }

    pub fn raw_class_methods(&self, klass: jclass) -> Result<(*mut jmethodID, jint), jvmtiError> {
        self.state().method_table_reads += 1;
        let class = self.class(klass).ok_or(jvmtiError::INVALID_CLASS)?;
        if self.unreadable_classes.contains(&(klass as usize)) {
            return Err(jvmtiError::CLASS_NOT_PREPARED);
        }

        let ids: Vec<usize> = (0..class.methods.len())
            .map(|i| method_id(klass as usize, i))
            .collect();
        if ids.is_empty() {
            return Ok((ptr::null_mut(), 0));
        }
        let len = ids.len() as jint;
        let ptr = ids.as_ptr() as *mut jmethodID;
        let mut state = self.state();
        state.live.insert(ptr as usize, Buffer::Methods(ids));
        state.allocations += 1;
        Ok((ptr, len))
    }

    pub fn raw_method_name(&self, method: jmethodID) -> Result<(*mut c_char, *mut c_char), jvmtiError> {
        self.state().method_name_reads += 1;
        if self.unreadable_methods.contains(&(method as usize)) {
            return Err(jvmtiError::INVALID_METHODID);
        }
        let (name, signature) = self.method_desc(method).ok_or(jvmtiError::INVALID_METHODID)?;
        Ok((self.alloc_str(name), self.alloc_str(signature)))
    }

    pub fn raw_set_breakpoint(&self, method: jmethodID, location: jlocation) -> jvmtiError {
        let mut state = self.state();
        state.breakpoint_attempts += 1;
        if let Some(error) = self.reject_breakpoints {
            return error;
        }
        if self.method_desc(method).is_none() {
            return jvmtiError::INVALID_METHODID;
        }
        let key = (method as usize, location);
        if state.breakpoints.contains(&key) {
            return jvmtiError::DUPLICATE;
        }
        state.breakpoints.push(key);
        jvmtiError::NONE
    }

    pub fn raw_deallocate(&self, mem: *mut u8) -> jvmtiError {
        if mem.is_null() {
            return jvmtiError::NONE;
        }
        let mut state = self.state();
        match state.live.remove(&(mem as usize)) {
            Some(_) => {
                state.deallocations += 1;
                jvmtiError::NONE
            }
            None => {
                state.bad_frees += 1;
                jvmtiError::ILLEGAL_ARGUMENT
            }
        }
    }
}

fn method_id(klass: usize, index: usize) -> usize {
    (klass << 16) | (index + 1)
}

fn check(error: jvmtiError) -> Result<(), jvmtiError> {
    if error.is_ok() {
        Ok(())
    } else {
        Err(error)
    }
}

impl DebugInterface for MockInterface {
    fn add_capabilities(&self, caps: &jvmtiCapabilities) -> Result<(), jvmtiError> {
        check(self.raw_add_capabilities(caps))
    }

    fn set_event_callbacks(&self, callbacks: &jvmtiEventCallbacks) -> Result<(), jvmtiError> {
        check(self.raw_set_event_callbacks(callbacks))
    }

    fn set_event_notification_mode(&self, enable: bool, event_type: u32, thread: jthread) -> Result<(), jvmtiError> {
        let mode = if enable { JVMTI_ENABLE } else { JVMTI_DISABLE };
        check(self.raw_set_event_notification_mode(mode, event_type, thread))
    }

    fn get_class_signature(&self, klass: jclass) -> Result<JvmtiString<'_, Self>, jvmtiError> {
        let ptr = self.raw_class_signature(klass)?;
        Ok(unsafe { JvmtiString::from_raw(self, ptr) })
    }

    fn get_class_methods(&self, klass: jclass) -> Result<JvmtiArray<'_, Self, jmethodID>, jvmtiError> {
        let (ptr, len) = self.raw_class_methods(klass)?;
        Ok(unsafe { JvmtiArray::from_raw(self, ptr, len as usize) })
    }

    fn get_method_name(&self, method: jmethodID) -> Result<MethodName<'_, Self>, jvmtiError> {
        let (name, signature) = self.raw_method_name(method)?;
        Ok(MethodName {
            name: unsafe { JvmtiString::from_raw(self, name) },
            signature: unsafe { JvmtiString::from_raw(self, signature) },
        })
    }

    fn set_breakpoint(&self, method: jmethodID, location: jlocation) -> Result<(), jvmtiError> {
        check(self.raw_set_breakpoint(method, location))
    }

    fn deallocate(&self, mem: *mut u8) -> Result<(), jvmtiError> {
        check(self.raw_deallocate(mem))
    }
}

// =============================================================================
// FakeJvm
// =============================================================================

/// A `JavaVM` plus `jvmtiEnv` backed by a [`MockInterface`].
///
/// `env` must stay the first field: the fake JVMTI functions recover the
/// `FakeJvm` from the `jvmtiEnv*` they are called with.
#[repr(C)]
pub struct FakeJvm {
    env: jvmtiEnv,
    vm: JavaVM,
    table: jvmtiInterface_1_,
    invoke: JNIInvokeInterface_,
    get_env_status: jint,
    pub mock: MockInterface,
}

impl FakeJvm {
    pub fn new(mock: MockInterface) -> Box<Self> {
        let mut jvm = Box::new(FakeJvm {
            env: jvmtiEnv { functions: ptr::null() },
            vm: ptr::null(),
            table: fake_table(),
            invoke: JNIInvokeInterface_ {
                reserved0: ptr::null_mut(),
                reserved1: ptr::null_mut(),
                reserved2: ptr::null_mut(),
                DestroyJavaVM: None,
                AttachCurrentThread: None,
                DetachCurrentThread: None,
                GetEnv: Some(fake_get_env),
                AttachCurrentThreadAsDaemon: None,
            },
            get_env_status: jni::JNI_OK,
            mock,
        });
        let this: *mut FakeJvm = &mut *jvm;
        jvm.invoke.reserved0 = this.cast();
        jvm.env.functions = &jvm.table;
        jvm.vm = &jvm.invoke;
        jvm
    }

    /// Make `GetEnv` fail with `status`.
    pub fn fail_get_env(&mut self, status: jint) {
        self.get_env_status = status;
    }

    /// For tests that knock entries out of the function table.
    pub fn table_mut(&mut self) -> &mut jvmtiInterface_1_ {
        &mut self.table
    }

    pub fn vm(&self) -> *mut JavaVM {
        &self.vm as *const JavaVM as *mut JavaVM
    }

    pub fn env(&self) -> *mut jvmtiEnv {
        &self.env as *const jvmtiEnv as *mut jvmtiEnv
    }
}

unsafe fn mock<'a>(env: *mut jvmtiEnv) -> &'a MockInterface {
    &(*(env as *const FakeJvm)).mock
}

unsafe extern "system" fn fake_get_env(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint {
    let jvm = &*((**vm).reserved0 as *const FakeJvm);
    if jvm.get_env_status != jni::JNI_OK {
        return jvm.get_env_status;
    }
    if version != JVMTI_VERSION_1_2 && version != JVMTI_VERSION_1_0 {
        return jni::JNI_EVERSION;
    }
    *penv = jvm.env().cast();
    jni::JNI_OK
}

unsafe extern "system" fn fake_set_event_notification_mode(
    env: *mut jvmtiEnv,
    mode: jint,
    event_type: u32,
    thread: jthread,
) -> jvmtiError {
    mock(env).raw_set_event_notification_mode(mode, event_type, thread)
}

unsafe extern "system" fn fake_set_breakpoint(env: *mut jvmtiEnv, method: jmethodID, location: jlocation) -> jvmtiError {
    mock(env).raw_set_breakpoint(method, location)
}

unsafe extern "system" fn fake_deallocate(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError {
    mock(env).raw_deallocate(mem)
}

unsafe extern "system" fn fake_get_class_signature(
    env: *mut jvmtiEnv,
    klass: jclass,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError {
    if !generic_ptr.is_null() {
        *generic_ptr = ptr::null_mut();
    }
    match mock(env).raw_class_signature(klass) {
        Ok(signature) => {
            *signature_ptr = signature;
            jvmtiError::NONE
        }
        Err(error) => error,
    }
}

unsafe extern "system" fn fake_get_class_methods(
    env: *mut jvmtiEnv,
    klass: jclass,
    method_count_ptr: *mut jint,
    methods_ptr: *mut *mut jmethodID,
) -> jvmtiError {
    match mock(env).raw_class_methods(klass) {
        Ok((methods, count)) => {
            *methods_ptr = methods;
            *method_count_ptr = count;
            jvmtiError::NONE
        }
        Err(error) => error,
    }
}

unsafe extern "system" fn fake_get_method_name(
    env: *mut jvmtiEnv,
    method: jmethodID,
    name_ptr: *mut *mut c_char,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError {
    if !generic_ptr.is_null() {
        *generic_ptr = ptr::null_mut();
    }
    match mock(env).raw_method_name(method) {
        Ok((name, signature)) => {
            *name_ptr = name;
            *signature_ptr = signature;
            jvmtiError::NONE
        }
        Err(error) => error,
    }
}

unsafe extern "system" fn fake_set_event_callbacks(
    env: *mut jvmtiEnv,
    callbacks: *const jvmtiEventCallbacks,
    size_of_callbacks: jint,
) -> jvmtiError {
    if callbacks.is_null() || size_of_callbacks as usize != std::mem::size_of::<jvmtiEventCallbacks>() {
        return jvmtiError::ILLEGAL_ARGUMENT;
    }
    mock(env).raw_set_event_callbacks(&*callbacks)
}

unsafe extern "system" fn fake_add_capabilities(env: *mut jvmtiEnv, caps: *const jvmtiCapabilities) -> jvmtiError {
    mock(env).raw_add_capabilities(&*caps)
}

fn fake_table() -> jvmtiInterface_1_ {
    jvmtiInterface_1_ {
        SetEventNotificationMode: Some(fake_set_event_notification_mode),
        SetBreakpoint: Some(fake_set_breakpoint),
        Deallocate: Some(fake_deallocate),
        GetClassSignature: Some(fake_get_class_signature),
        GetClassMethods: Some(fake_get_class_methods),
        GetMethodName: Some(fake_get_method_name),
        SetEventCallbacks: Some(fake_set_event_callbacks),
        AddCapabilities: Some(fake_add_capabilities),
        ..Default::default()
    }
}
