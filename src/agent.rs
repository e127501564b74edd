//! The concolic rendezvous agent.
//!
//! [`ConcolicAgent`] owns all process-wide state: the parsed options, the
//! installation phase, the recorded marker method and the breakpoint
//! dispatcher. A single instance lives in [`GLOBAL_AGENT`](crate::GLOBAL_AGENT)
//! for the lifetime of the JVM.

use std::sync::OnceLock;

use crate::binding;
use crate::config::AgentConfig;
use crate::dispatcher::{BreakpointDispatcher, Dispatch, LoggingHook, RendezvousHook};
use crate::env::{DebugInterface, Jvmti};
use crate::error::Result;
use crate::events;
use crate::lifecycle::{AgentPhase, PhaseCell};
use crate::logging;
use crate::resolver::TargetMethod;
use crate::sys::{jni, jvmti};
use crate::watcher::{self, WatchOutcome};
use crate::Agent;

pub struct ConcolicAgent<H: RendezvousHook = LoggingHook> {
    config: OnceLock<AgentConfig>,
    phase: PhaseCell,
    target: TargetMethod,
    dispatcher: BreakpointDispatcher<H>,
}

impl<H: RendezvousHook + Default> Default for ConcolicAgent<H> {
    fn default() -> Self {
        Self::with_hook(H::default())
    }
}

impl<H: RendezvousHook> ConcolicAgent<H> {
    pub fn with_hook(hook: H) -> Self {
        Self {
            config: OnceLock::new(),
            phase: PhaseCell::new(),
            target: TargetMethod::unset(),
            dispatcher: BreakpointDispatcher::new(hook),
        }
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase.get()
    }

    /// Rendezvous hits so far.
    pub fn hits(&self) -> u64 {
        self.dispatcher.hits()
    }

    pub fn target(&self) -> &TargetMethod {
        &self.target
    }

    pub fn config(&self) -> Option<&AgentConfig> {
        self.config.get()
    }

    pub fn hook(&self) -> &H {
        self.dispatcher.hook()
    }

    /// Full load sequence: options, logging, JVMTI binding, then
    /// [`activate`](Self::activate).
    pub fn attach(&self, vm: *mut jni::JavaVM, options: &str) -> Result<()> {
        let (config, rejected) = AgentConfig::parse(options);
        logging::init(config.log_filter.as_deref());
        for option in &rejected {
            log::warn!("ignoring agent option {}", option);
        }
        log::info!(
            "loading, target {}.{}{}",
            config.target.class_signature(),
            config.target.method_name(),
            config.target.method_signature()
        );

        let jvmti = binding::bind(vm)?;
        self.activate(&jvmti, config)
    }

    /// Request the breakpoint capability and start watching class
    /// preparation through `iface`.
    ///
    /// The configuration is fixed before any event is enabled, so no
    /// callback ever observes an agent without one.
    pub fn activate<D: DebugInterface + ?Sized>(&self, iface: &D, config: AgentConfig) -> Result<()> {
        if self.config.set(config).is_err() {
            log::warn!("agent already configured, keeping the first options");
        }

        binding::request_capabilities(iface)?;
        self.phase.advance(AgentPhase::InterfaceBound);

        events::register(iface, &events::callback_table())?;
        self.phase.advance(AgentPhase::Watching);
        log::debug!("phase {}", self.phase());
        Ok(())
    }

    pub fn handle_class_prepare<D: DebugInterface + ?Sized>(&self, iface: &D, klass: jni::jclass) -> WatchOutcome {
        let Some(config) = self.config.get() else {
            return WatchOutcome::NotTarget;
        };

        let outcome = watcher::on_class_prepare(iface, klass, &config.target, &self.target);
        if matches!(outcome, WatchOutcome::Installed(_)) && self.phase.advance(AgentPhase::Installed) {
            log::debug!("phase {}", AgentPhase::Installed);
        }
        outcome
    }

    pub fn handle_breakpoint(
        &self,
        jni: *mut jni::JNIEnv,
        thread: jni::jthread,
        method: jni::jmethodID,
        location: jvmti::jlocation,
    ) -> Dispatch {
        self.dispatcher.dispatch(&self.target, jni, thread, method, location)
    }
}

impl<H: RendezvousHook> Agent for ConcolicAgent<H> {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        match self.attach(vm, options) {
            Ok(()) => {
                log::info!("agent loaded, waiting for the marker class");
                jni::JNI_OK
            }
            Err(e) => {
                log::error!("agent failed to load: {}", e);
                jni::JNI_ERR
            }
        }
    }

    fn on_unload(&self) {
        log::info!("agent unloaded ({} rendezvous hits, phase {})", self.hits(), self.phase());
    }

    fn class_prepare(&self, jvmti: &Jvmti, _jni: *mut jni::JNIEnv, _thread: jni::jthread, klass: jni::jclass) {
        self.handle_class_prepare(jvmti, klass);
    }

    fn breakpoint(
        &self,
        _jvmti: &Jvmti,
        jni: *mut jni::JNIEnv,
        thread: jni::jthread,
        method: jni::jmethodID,
        location: jvmti::jlocation,
    ) {
        self.handle_breakpoint(jni, thread, method, location);
    }
}
