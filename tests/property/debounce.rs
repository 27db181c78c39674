// tests/property/debounce.rs

use std::time::{Duration, SystemTime};

use proptest::prelude::*;
use tokio::time::Instant;

use relaunch::engine::{Admission, DebounceGate, MIN_RELOAD_INTERVAL};
use relaunch::types::MAX_DURATION;

/// Sorted notification offsets in milliseconds.
fn offsets() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(0u64..20_000, 1..60).prop_map(|mut v| {
        v.sort_unstable();
        v
    })
}

fn opt_ms(max: u64) -> impl Strategy<Value = Option<Duration>> {
    proptest::option::of((0..max).prop_map(Duration::from_millis))
}

proptest! {
    #[test]
    fn accepted_reloads_are_more_than_one_interval_apart(
        times in offsets(),
        interval in opt_ms(6_000),
        settle in opt_ms(4_000),
    ) {
        let base = Instant::now();
        let wall = SystemTime::now();
        let mut gate = DebounceGate::new(interval, settle);

        // Effective start of each accepted reload, settle included.
        let mut starts: Vec<Instant> = Vec::new();
        for ms in &times {
            let offset = Duration::from_millis(*ms);
            let at = base + offset;
            match gate.admit(at, wall + offset) {
                Admission::Accepted { settle } => {
                    prop_assert!(settle.is_none() || starts.is_empty());
                    starts.push(at + settle.unwrap_or_default());
                }
                Admission::Rejected => {
                    prop_assert!(!starts.is_empty());
                }
            }
            prop_assert!(gate.interval() >= MIN_RELOAD_INTERVAL);
        }

        prop_assert!(!starts.is_empty(), "the first notification is always accepted");
        prop_assert_eq!(gate.accepted_count(), starts.len() as u64);
        for pair in starts.windows(2) {
            prop_assert!(pair[1] > pair[0] + gate.interval());
        }
    }

    #[test]
    fn explicit_interval_is_kept_after_settling(
        interval_ms in 0u64..6_000,
        settle_ms in 1u64..8_000,
    ) {
        let interval = Duration::from_millis(interval_ms);
        let mut gate = DebounceGate::new(Some(interval), Some(Duration::from_millis(settle_ms)));
        gate.admit(Instant::now(), SystemTime::now());
        prop_assert_eq!(gate.interval(), interval.max(MIN_RELOAD_INTERVAL));
    }

    #[test]
    fn settle_becomes_the_interval_when_none_is_set(settle_ms in 1u64..8_000) {
        let settle = Duration::from_millis(settle_ms);
        let mut gate = DebounceGate::new(None, Some(settle));
        let admitted = gate.admit(Instant::now(), SystemTime::now());
        prop_assert_eq!(admitted, Admission::Accepted { settle: Some(settle) });
        prop_assert_eq!(gate.interval(), settle.max(MIN_RELOAD_INTERVAL));
    }

    #[test]
    fn huge_durations_are_capped(
        interval_secs in any::<u64>(),
        settle_secs in any::<u64>(),
        later_secs in 0u64..10_000,
    ) {
        let base = Instant::now();
        let wall = SystemTime::now();
        let mut gate = DebounceGate::new(
            Some(Duration::from_secs(interval_secs)),
            Some(Duration::from_secs(settle_secs)),
        );

        match gate.admit(base, wall) {
            Admission::Accepted { settle } => {
                prop_assert!(settle.unwrap_or_default() <= MAX_DURATION);
            }
            Admission::Rejected => prop_assert!(false, "the first notification is always accepted"),
        }
        let later = Duration::from_secs(later_secs);
        gate.admit(base + later, wall + later);

        prop_assert!(gate.interval() >= MIN_RELOAD_INTERVAL);
        prop_assert!(gate.interval() <= MAX_DURATION);
    }
}
