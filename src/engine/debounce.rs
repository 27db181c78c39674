// src/engine/debounce.rs

//! Pure reload rate-limiting policy.
//!
//! No IO here: callers pass the notification time in. Times are
//! `tokio::time::Instant` so tests can drive the policy with a paused clock.

use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use crate::types::MAX_DURATION;

/// Lowest reload interval a project can be configured with.
pub const MIN_RELOAD_INTERVAL: Duration = Duration::from_secs(2);

/// Result of presenting a change notification to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Too soon after the previous accepted reload.
    Rejected,
    /// Reload now, after sleeping `settle` if present.
    Accepted { settle: Option<Duration> },
}

/// Per-project debounce state.
///
/// - A notification at `T` is accepted only if `T` is strictly after
///   `last_accepted + interval`.
/// - The first accepted notification waits `settle` before reloading. If no
///   interval was set explicitly, the settle delay (never below the floor)
///   becomes the interval from then on.
/// - Interval and settle delay are capped at [`MAX_DURATION`], so the
///   recorded times cannot overflow.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    interval: Duration,
    explicit_interval: bool,
    settle: Option<Duration>,
    last_accepted: Option<Instant>,
    last_accepted_wall: Option<SystemTime>,
    accepted: u64,
}

impl DebounceGate {
    pub fn new(interval: Option<Duration>, settle: Option<Duration>) -> Self {
        Self {
            interval: clamp_interval(interval.unwrap_or(MIN_RELOAD_INTERVAL)),
            explicit_interval: interval.is_some(),
            settle: settle.filter(|d| !d.is_zero()).map(|d| d.min(MAX_DURATION)),
            last_accepted: None,
            last_accepted_wall: None,
            accepted: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }

    /// Wall-clock time the last accepted reload started at.
    pub fn last_accepted_wall(&self) -> Option<SystemTime> {
        self.last_accepted_wall
    }

    /// Decide whether a notification observed at `at` (wall clock `wall`)
    /// should trigger a reload, and record it if so.
    ///
    /// The recorded reload time includes any settle sleep, so notifications
    /// arriving while the first reload is settling are coalesced into it.
    pub fn admit(&mut self, at: Instant, wall: SystemTime) -> Admission {
        if let Some(last) = self.last_accepted {
            if at <= last + self.interval {
                return Admission::Rejected;
            }
        }

        let settle = if self.accepted == 0 { self.settle } else { None };
        if let Some(delay) = settle {
            if !self.explicit_interval {
                self.interval = clamp_interval(delay);
            }
        }

        let pause = settle.unwrap_or(Duration::ZERO);
        self.last_accepted = Some(at + pause);
        self.last_accepted_wall = Some(wall + pause);
        self.accepted += 1;

        Admission::Accepted { settle }
    }
}

/// Raise `interval` to the floor and cap it at [`MAX_DURATION`].
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_RELOAD_INTERVAL, MAX_DURATION)
}
