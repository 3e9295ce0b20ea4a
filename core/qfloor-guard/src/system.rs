//! The self-destruct state machine.

use crate::action::TriggerAction;
use crate::debugger::{DebuggerProbe, default_probe};
use crate::error::{GuardError, GuardResult};
use crate::event::{
    EVENT_DEBUGGER_DETECTED, EVENT_FILE_MISSING, EVENT_FILE_MODIFIED, Severity, TamperEvent,
};
use qfloor_integrity::{IntegrityError, hash_file};
use rand::RngCore;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zeroize::Zeroize;

/// Observer notified of every recorded [`TamperEvent`].
pub type TamperCallback = Arc<dyn Fn(&TamperEvent) + Send + Sync>;

const OVERWRITE_CHUNK: usize = 64 * 1024;

/// Watches a set of files and the process environment for tampering.
///
/// Lifecycle: disarmed, armed, triggered. Triggering happens at most once
/// per instance and cannot be undone. Mutation goes through `&mut self`;
/// share the system behind a mutex.
pub struct SelfDestructSystem {
    protected: BTreeSet<PathBuf>,
    baseline: BTreeMap<PathBuf, String>,
    has_baseline: bool,
    events: Vec<TamperEvent>,
    callbacks: Vec<TamperCallback>,
    action: TriggerAction,
    probe: Box<dyn DebuggerProbe>,
    armed: bool,
    triggered: bool,
}

impl fmt::Debug for SelfDestructSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfDestructSystem")
            .field("protected", &self.protected)
            .field("armed", &self.armed)
            .field("triggered", &self.triggered)
            .field("events", &self.events.len())
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl Default for SelfDestructSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SelfDestructSystem {
    /// A disarmed system using the platform debugger probe and
    /// [`TriggerAction::Terminate`] with exit code 1.
    pub fn new() -> Self {
        Self {
            protected: BTreeSet::new(),
            baseline: BTreeMap::new(),
            has_baseline: false,
            events: Vec::new(),
            callbacks: Vec::new(),
            action: TriggerAction::default(),
            probe: default_probe(),
            armed: false,
            triggered: false,
        }
    }

    pub fn with_action(mut self, action: TriggerAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_probe(mut self, probe: impl DebuggerProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Baseline digests, keyed by the path given to [`arm`](Self::arm).
    pub fn baseline(&self) -> &BTreeMap<PathBuf, String> {
        &self.baseline
    }

    pub fn action(&self) -> &TriggerAction {
        &self.action
    }

    /// Snapshot of the tamper log, oldest first.
    pub fn events(&self) -> Vec<TamperEvent> {
        self.events.clone()
    }

    pub fn add_callback(&mut self, callback: impl Fn(&TamperEvent) + Send + Sync + 'static) {
        self.callbacks.push(Arc::new(callback));
    }

    /// Hashes `paths` and starts monitoring them.
    ///
    /// Paths that do not exist are skipped. Arming again with the same set
    /// of paths keeps the existing baseline.
    ///
    /// # Errors
    ///
    /// [`GuardError::AlreadyTriggered`] after [`trigger`](Self::trigger);
    /// an I/O error if an existing file cannot be read.
    pub fn arm<I, P>(&mut self, paths: I) -> GuardResult<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        if self.triggered {
            return Err(GuardError::AlreadyTriggered);
        }

        let requested: BTreeSet<PathBuf> =
            paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();

        if self.has_baseline && requested == self.protected {
            debug!("reusing baseline for {} paths", self.baseline.len());
        } else {
            let mut baseline = BTreeMap::new();
            for path in &requested {
                match hash_file(path) {
                    Ok(digest) => {
                        baseline.insert(path.clone(), digest);
                    }
                    Err(IntegrityError::NotFound(_)) => {
                        debug!("skipping missing protected path {:?}", path);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            wipe(&mut self.baseline);
            self.baseline = baseline;
            self.protected = requested;
            self.has_baseline = true;
        }

        self.armed = true;
        info!("self-destruct system armed ({} files)", self.baseline.len());
        Ok(())
    }

    /// Stops monitoring. The baseline is kept.
    pub fn disarm(&mut self) {
        self.armed = false;
        info!("self-destruct system disarmed");
    }

    /// Compares every baselined file with its digest.
    ///
    /// Stops at the first missing or modified file, records a critical
    /// event for it and returns false. Always true while disarmed.
    pub fn check_integrity(&mut self) -> bool {
        if !self.armed {
            return true;
        }

        let mut failure = None;
        for (path, expected) in &self.baseline {
            match hash_file(path) {
                Ok(actual) if actual == *expected => {}
                Ok(_) => {
                    failure = Some((EVENT_FILE_MODIFIED, path.clone()));
                    break;
                }
                Err(IntegrityError::NotFound(_)) => {
                    failure = Some((EVENT_FILE_MISSING, path.clone()));
                    break;
                }
                Err(e) => {
                    warn!("cannot hash protected file {:?}: {}", path, e);
                    failure = Some((EVENT_FILE_MODIFIED, path.clone()));
                    break;
                }
            }
        }

        match failure {
            None => true,
            Some((event_type, path)) => {
                let details = if event_type == EVENT_FILE_MISSING {
                    format!("Protected file missing: {}", path.display())
                } else {
                    format!("Protected file modified: {}", path.display())
                };
                self.record_tamper(event_type, details, Severity::Critical, Some(&path));
                false
            }
        }
    }

    /// Asks the debugger probe. A detection is a fatal event.
    pub fn check_debugger(&mut self) -> bool {
        match self.probe.detect() {
            None => true,
            Some(details) => {
                self.record_tamper(EVENT_DEBUGGER_DETECTED, details, Severity::Fatal, None);
                false
            }
        }
    }

    /// Runs [`check_integrity`](Self::check_integrity) then
    /// [`check_debugger`](Self::check_debugger). True only if both pass.
    pub fn run_checks(&mut self) -> bool {
        let intact = self.check_integrity();
        let clean = self.check_debugger();
        intact && clean
    }

    /// Appends an event to the log and notifies every callback.
    ///
    /// A panicking callback is logged and skipped. A fatal event triggers
    /// the self-destruct once the callbacks have run.
    pub fn record_tamper(
        &mut self,
        event_type: &str,
        details: impl Into<String>,
        severity: Severity,
        file_path: Option<&Path>,
    ) {
        let event = TamperEvent::new(
            event_type,
            details,
            severity,
            file_path.map(Path::to_path_buf),
        );
        warn!("tamper event [{}]: {} - {}", event.severity, event.event_type, event.details);

        for callback in &self.callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!("tamper callback panicked on {}", event.event_type);
            }
        }
        self.events.push(event);

        if severity == Severity::Fatal {
            self.trigger();
        }
    }

    /// Fires the self-destruct. Only the first call has any effect.
    ///
    /// Wipes the baseline digests, then runs the configured
    /// [`TriggerAction`]. With [`TriggerAction::Terminate`] this does not
    /// return.
    pub fn trigger(&mut self) {
        if self.triggered {
            return;
        }
        self.triggered = true;

        let last = self.events.last();
        let event_type = last.map_or("manual", |e| e.event_type.as_str());
        let path = last
            .and_then(|e| e.file_path.as_deref())
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());
        error!("SELF-DESTRUCT TRIGGERED: {} (path: {})", event_type, path);

        wipe(&mut self.baseline);

        match &self.action {
            TriggerAction::Terminate { exit_code } => std::process::exit(*exit_code),
            TriggerAction::Log => {}
            TriggerAction::SecureDelete => {
                for path in &self.protected {
                    if let Err(e) = secure_delete(path) {
                        warn!("secure delete of {:?} failed: {}", path, e);
                    }
                }
            }
            TriggerAction::Custom(handler) => {
                if catch_unwind(AssertUnwindSafe(|| handler(last))).is_err() {
                    warn!("custom trigger action panicked");
                }
            }
        }
    }
}

fn wipe(baseline: &mut BTreeMap<PathBuf, String>) {
    for digest in baseline.values_mut() {
        digest.zeroize();
    }
    baseline.clear();
}

/// Overwrites `path` with random bytes of the same length, then removes it.
/// A missing file is not an error.
pub fn secure_delete(path: &Path) -> std::io::Result<()> {
    let len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let mut file = OpenOptions::new().write(true).open(path)?;
    let mut rng = rand::thread_rng();
    let mut chunk = vec![0u8; OVERWRITE_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(OVERWRITE_CHUNK as u64) as usize;
        rng.fill_bytes(&mut chunk[..n]);
        file.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    file.sync_all()?;
    drop(file);

    fs::remove_file(path)?;
    info!("securely deleted {:?}", path);
    Ok(())
}
