//! Host capability detection.
//!
//! The game only starts its windowed phase when the host can actually show a
//! window. Detection runs once, before the event loop is created, so headless
//! hosts (CI, SSH sessions) fail fast with a readable message instead of a
//! panic deep inside the windowing backend.

/// What the current host process is able to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    pub display: bool,
}

impl HostCapabilities {
    /// Short reason string for logs when the windowed phase cannot start.
    pub fn missing_reason(&self) -> Option<&'static str> {
        if self.display {
            None
        } else {
            Some("no display server detected (set DISPLAY or WAYLAND_DISPLAY)")
        }
    }
}

/// Probe the process environment.
pub fn detect() -> HostCapabilities {
    detect_with(|name| std::env::var_os(name).is_some())
}

/// Probe using a caller-supplied environment lookup.
pub fn detect_with(has_var: impl Fn(&str) -> bool) -> HostCapabilities {
    let display = if cfg!(all(unix, not(target_os = "macos"), not(target_os = "ios"))) {
        has_var("DISPLAY") || has_var("WAYLAND_DISPLAY")
    } else {
        // Windows and macOS always expose a desktop session to GUI processes.
        true
    };
    log::debug!("Host capabilities: display={}", display);
    HostCapabilities { display }
}
