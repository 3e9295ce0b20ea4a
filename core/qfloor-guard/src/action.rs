use crate::event::TamperEvent;
use std::fmt;
use std::sync::Arc;

/// Handler run by [`TriggerAction::Custom`] with the last recorded event.
pub type TriggerHandler = Arc<dyn Fn(Option<&TamperEvent>) + Send + Sync>;

/// What [`SelfDestructSystem::trigger`](crate::SelfDestructSystem::trigger)
/// does after wiping its baseline.
#[derive(Clone)]
pub enum TriggerAction {
    /// Exit the process.
    Terminate { exit_code: i32 },
    /// Log only; the process keeps running.
    Log,
    /// Overwrite every protected file with random bytes, then remove it.
    SecureDelete,
    Custom(TriggerHandler),
}

impl TriggerAction {
    pub fn custom(handler: impl Fn(Option<&TamperEvent>) + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(handler))
    }
}

impl Default for TriggerAction {
    fn default() -> Self {
        Self::Terminate { exit_code: 1 }
    }
}

impl fmt::Debug for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate { exit_code } => f
                .debug_struct("Terminate")
                .field("exit_code", exit_code)
                .finish(),
            Self::Log => f.write_str("Log"),
            Self::SecureDelete => f.write_str("SecureDelete"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
