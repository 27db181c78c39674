use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which change-detection strategy drives the reload loop.
///
/// - `Signal`: OS filesystem notifications (default).
/// - `Poll`: periodic directory walks comparing modification times. Useful on
///   network mounts and containers where notifications are unreliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherKind {
    Signal,
    Poll,
}

impl Default for WatcherKind {
    fn default() -> Self {
        WatcherKind::Signal
    }
}

impl FromStr for WatcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "signal" | "notify" | "fsnotify" => Ok(WatcherKind::Signal),
            "poll" | "walk" | "polling" => Ok(WatcherKind::Poll),
            other => Err(format!(
                "invalid watcher: {other} (expected \"signal\" or \"poll\")"
            )),
        }
    }
}

impl fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherKind::Signal => f.write_str("signal"),
            WatcherKind::Poll => f.write_str("poll"),
        }
    }
}

/// Operating-system family, used to pick process termination commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Darwin,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Darwin
        } else {
            Platform::Other
        }
    }

    /// Suffix appended to produced binaries.
    pub fn exe_suffix(self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            _ => "",
        }
    }
}

/// Longest duration accepted anywhere a duration is configured.
pub const MAX_DURATION: std::time::Duration =
    std::time::Duration::from_secs(365 * 24 * 60 * 60);

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
///
/// Values above [`MAX_DURATION`] are rejected.
pub fn parse_duration(s: &str) -> Result<std::time::Duration, String> {
    use std::time::Duration;

    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let too_long = || {
        format!(
            "duration '{s}' is longer than {}h",
            MAX_DURATION.as_secs() / 3600
        )
    };
    let duration = match unit.as_str() {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(too_long)?),
        "h" => Duration::from_secs(value.checked_mul(60 * 60).ok_or_else(too_long)?),
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    if duration > MAX_DURATION {
        return Err(too_long());
    }
    Ok(duration)
}
