//! Target protocol constants and agent options.
//!
//! Options come from the `-agentpath` string as comma-separated
//! `key=value` pairs:
//!
//! ```text
//! java -agentpath:libconcolic_agent.so=class=org.example.Marker,method=hit,log=debug Main
//! ```
//!
//! | Key      | Meaning                                                     |
//! |----------|-------------------------------------------------------------|
//! | `class`  | marker class, dotted (`a.b.C`) or signature (`La/b/C;`)     |
//! | `method` | marker method name; the signature is always `()V`           |
//! | `log`    | `env_logger` filter, e.g. `debug` or `concolic_agent=trace` |
//!
//! With no options the agent watches `ConcolicHelper.breakpoint()V`.
//! Options that are not understood are logged and skipped; they never stop
//! the JVM from starting.

use thiserror::Error;

use crate::sys::jvmti::jlocation;

/// JVM signature of the marker class.
pub const TARGET_CLASS_SIGNATURE: &str = "Lorg/usvm/instrumentation/ConcolicHelper;";
/// Name of the marker method.
pub const TARGET_METHOD_NAME: &str = "breakpoint";
/// Takes no arguments, returns nothing.
pub const TARGET_METHOD_SIGNATURE: &str = "()V";
/// Breakpoint location: the first bytecode of the method.
pub const TARGET_LOCATION: jlocation = 0;

/// The one class/method pair the agent instruments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    class_signature: String,
    method_name: String,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            class_signature: TARGET_CLASS_SIGNATURE.to_string(),
            method_name: TARGET_METHOD_NAME.to_string(),
        }
    }
}

impl TargetSpec {
    pub fn new(class_signature: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_signature: class_signature.into(),
            method_name: method_name.into(),
        }
    }

    pub fn class_signature(&self) -> &str {
        &self.class_signature
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn method_signature(&self) -> &'static str {
        TARGET_METHOD_SIGNATURE
    }

    pub fn location(&self) -> jlocation {
        TARGET_LOCATION
    }
}

/// Everything the agent reads from its options string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    pub target: TargetSpec,
    /// `log=` filter; `None` defers to the environment.
    pub log_filter: Option<String>,
}

impl AgentConfig {
    /// Parse the options string. Nothing here can fail the load: an option
    /// that is not understood is handed back as a [`RejectedOption`] and
    /// its key keeps the default.
    pub fn parse(options: &str) -> (Self, Vec<RejectedOption>) {
        let mut config = AgentConfig::default();
        let mut rejected = Vec::new();

        for option in options.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Err(reason) = config.apply(option) {
                rejected.push(RejectedOption {
                    option: option.to_string(),
                    reason,
                });
            }
        }

        (config, rejected)
    }

    fn apply(&mut self, option: &str) -> Result<(), &'static str> {
        let (key, value) = option
            .split_once('=')
            .map(|(key, value)| (key.trim(), value.trim()))
            .ok_or("expected key=value")?;
        if value.is_empty() {
            return Err("empty value");
        }

        match key {
            "class" => self.target.class_signature = class_signature(value).ok_or("not a class name")?,
            "method" => {
                if !is_method_name(value) {
                    return Err("not a method name");
                }
                self.target.method_name = value.to_string();
            }
            "log" => self.log_filter = Some(value.to_string()),
            _ => return Err("unknown key"),
        }
        Ok(())
    }
}

/// An option that was ignored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{option}`: {reason}")]
pub struct RejectedOption {
    pub option: String,
    pub reason: &'static str,
}

/// `org.example.Marker` or `Lorg/example/Marker;` -> `Lorg/example/Marker;`
fn class_signature(value: &str) -> Option<String> {
    let internal = match value.strip_prefix('L').and_then(|v| v.strip_suffix(';')) {
        Some(internal) => internal.to_string(),
        None => {
            if value.contains('/') {
                return None;
            }
            value.replace('.', "/")
        }
    };

    let valid = internal
        .split('/')
        .all(|part| !part.is_empty() && !part.contains(|c: char| "[;.<>".contains(c) || c.is_whitespace()));
    valid.then(|| format!("L{};", internal))
}

fn is_method_name(value: &str) -> bool {
    !value.contains(|c: char| "./;[<>()".contains(c) || c.is_whitespace())
}
