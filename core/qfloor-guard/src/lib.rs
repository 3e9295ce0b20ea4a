//! Tamper monitoring for Quantum Lock.
//!
//! [`SelfDestructSystem`] hashes a set of protected files when armed and
//! reports any later change or removal as a critical [`TamperEvent`]. A
//! [`DebuggerProbe`] chosen for the build target looks for an attached
//! debugger; a detection is fatal. The first fatal event triggers the
//! configured [`TriggerAction`], which by default exits the process.
//!
//! ```no_run
//! use qfloor_guard::{SelfDestructSystem, TriggerAction};
//!
//! let mut guard = SelfDestructSystem::new().with_action(TriggerAction::Log);
//! guard.arm(["model.bin", "model.lock"])?;
//! if !guard.run_checks() {
//!     for event in guard.events() {
//!         eprintln!("{}: {}", event.event_type, event.details);
//!     }
//! }
//! # Ok::<(), qfloor_guard::GuardError>(())
//! ```

mod action;
mod debugger;
mod error;
mod event;
mod system;

pub use action::{TriggerAction, TriggerHandler};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use debugger::LinuxProbe;
#[cfg(windows)]
pub use debugger::WindowsProbe;
pub use debugger::{DebuggerProbe, NullProbe, default_probe, parse_tracer_pid};
pub use error::{GuardError, GuardResult};
pub use event::{
    EVENT_DEBUGGER_DETECTED, EVENT_FILE_MISSING, EVENT_FILE_MODIFIED, Severity, TamperEvent,
};
pub use system::{SelfDestructSystem, TamperCallback, secure_delete};
