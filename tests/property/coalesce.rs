// tests/property/coalesce.rs

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;

use relaunch::watch::Coalescer;

proptest! {
    /// Every key pushed is eventually flushed exactly once per quiet period,
    /// carrying the most recent value.
    #[test]
    fn flush_yields_each_key_once_with_its_last_value(
        events in proptest::collection::vec((0u8..5, 0u32..1000, 0u64..50), 1..80),
    ) {
        let window = Duration::from_millis(100);
        let mut coalescer = Coalescer::new(window);
        let mut now = Instant::now();
        let mut last: BTreeMap<u8, u32> = BTreeMap::new();

        for (key, value, step) in &events {
            now += Duration::from_millis(*step);
            let early = coalescer.take_due(now);
            for (k, _) in &early {
                last.remove(k);
            }
            coalescer.push(*key, *value, now);
            last.insert(*key, *value);
        }

        let flushed = coalescer.take_due(now + window);
        let keys: BTreeSet<u8> = flushed.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(keys.len(), flushed.len());
        for (k, v) in &flushed {
            prop_assert_eq!(last.get(k), Some(v));
        }
        prop_assert_eq!(keys, last.keys().copied().collect::<BTreeSet<_>>());
        prop_assert!(coalescer.is_empty());
        prop_assert!(coalescer.next_deadline().is_none());
    }
}
