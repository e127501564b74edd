//! Raw FFI bindings.
//!
//! Only the JNI and JVMTI surface this agent touches is declared here; the
//! layouts follow the JDK headers slot for slot.

pub mod jni;
pub mod jvmti;
