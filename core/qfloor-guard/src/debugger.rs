//! Platform debugger detection.

/// Reports whether a debugger is attached to this process.
///
/// Implementations return a human-readable description of what they found.
/// A probe that cannot inspect the process reports nothing.
pub trait DebuggerProbe: Send + Sync {
    fn detect(&self) -> Option<String>;
}

/// Reads `TracerPid` from `/proc/self/status`.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxProbe;

#[cfg(any(target_os = "linux", target_os = "android"))]
impl DebuggerProbe for LinuxProbe {
    fn detect(&self) -> Option<String> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        match parse_tracer_pid(&status)? {
            0 => None,
            pid => Some(format!("Linux debugger detected (PID: {pid})")),
        }
    }
}

/// Asks `IsDebuggerPresent`.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsProbe;

#[cfg(windows)]
impl DebuggerProbe for WindowsProbe {
    fn detect(&self) -> Option<String> {
        let present =
            unsafe { windows_sys::Win32::System::Diagnostics::Debug::IsDebuggerPresent() != 0 };
        present.then(|| "Windows debugger detected".to_string())
    }
}

/// Never detects anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl DebuggerProbe for NullProbe {
    fn detect(&self) -> Option<String> {
        None
    }
}

/// The probe for the target platform.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn default_probe() -> Box<dyn DebuggerProbe> {
    Box::new(LinuxProbe)
}

#[cfg(windows)]
pub fn default_probe() -> Box<dyn DebuggerProbe> {
    Box::new(WindowsProbe)
}

#[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
pub fn default_probe() -> Box<dyn DebuggerProbe> {
    Box::new(NullProbe)
}

/// Extracts the `TracerPid` value from the text of `/proc/<pid>/status`.
///
/// Returns `None` when the field is absent or not a number.
pub fn parse_tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str =
        "Name:\tqfloor\nState:\tR (running)\nTgid:\t4242\nTracerPid:\t0\nUid:\t1000\n";

    #[test]
    fn untraced_status() {
        assert_eq!(parse_tracer_pid(STATUS), Some(0));
    }

    #[test]
    fn traced_status() {
        let status = STATUS.replace("TracerPid:\t0", "TracerPid:\t31337");
        assert_eq!(parse_tracer_pid(&status), Some(31337));
    }

    #[test]
    fn missing_or_garbled_field() {
        assert_eq!(parse_tracer_pid("Name:\tqfloor\n"), None);
        assert_eq!(parse_tracer_pid("TracerPid:\tabc\n"), None);
        assert_eq!(parse_tracer_pid(""), None);
    }

    #[test]
    fn null_probe_is_silent() {
        assert_eq!(NullProbe.detect(), None);
    }
}
