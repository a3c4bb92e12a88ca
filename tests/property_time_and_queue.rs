//! Property-based invariants for `VTime` conversions and `EventQueue`
//! ordering, in the style of the pack's `task_queue` crate (see
//! `paulgsc-server/crates/task_queue`), which reaches for `proptest` for
//! this same category of structural invariant.

use proptest::prelude::*;
use vrtime_engine::queue::EventQueue;
use vrtime_engine::time::{seconds_to_ticks, ticks_to_seconds, VTime};

proptest! {
    #[test]
    fn round_trip_seconds_to_ticks_within_one_tick(seconds in -1.0e6_f64..1.0e6_f64) {
        let ticks = seconds_to_ticks(seconds);
        let back = ticks_to_seconds(ticks);
        let forward_ticks = seconds_to_ticks(back);
        prop_assert!((forward_ticks - ticks).abs() <= 1);
    }

    #[test]
    fn plus_sums_ticks_and_takes_dominant_priority(
        a_ticks in -1_000_000_i64..1_000_000,
        a_pri in -1000_i64..1000,
        b_ticks in -1_000_000_i64..1_000_000,
        b_pri in -1000_i64..1000,
    ) {
        let a = VTime::new(a_ticks, a_pri);
        let b = VTime::new(b_ticks, b_pri);
        let sum = a.plus(&b);
        prop_assert_eq!(sum.ticks(), a_ticks + b_ticks);
        prop_assert_eq!(sum.pri(), a_pri.max(b_pri));
    }

    #[test]
    fn insert_ids_are_strictly_monotone(values in proptest::collection::vec(any::<i32>(), 1..64)) {
        let queue: EventQueue<i32> = EventQueue::new();
        let mut last = 0u64;
        for v in values {
            let id = queue.insert(v, VTime::new(0, 0));
            prop_assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn pop_order_matches_sorted_times(mut times in proptest::collection::vec(-10_000_i64..10_000, 1..64)) {
        let queue: EventQueue<i64> = EventQueue::new();
        for &t in &times {
            queue.insert(t, VTime::new(t, 0));
        }
        times.sort_unstable();
        let mut popped = Vec::new();
        while let Some(v) = queue.pop() {
            popped.push(v);
        }
        prop_assert_eq!(popped, times);
    }

    #[test]
    fn heap_root_is_always_the_minimum_live_time(
        inserts in proptest::collection::vec(-10_000_i64..10_000, 1..48),
        remove_every_third in any::<bool>(),
    ) {
        let queue: EventQueue<i64> = EventQueue::new();
        let mut live: Vec<(u64, i64)> = Vec::new();
        for (i, &t) in inserts.iter().enumerate() {
            let id = queue.insert(t, VTime::new(t, 0));
            live.push((id, t));
            if remove_every_third && i % 3 == 2 && !live.is_empty() {
                let (remove_id, _) = live.remove(0);
                queue.remove(remove_id);
            }
            if let Some(&expected_min) = live.iter().map(|(_, t)| t).min() {
                prop_assert_eq!(queue.min_time().ticks(), expected_min);
            }
        }
    }
}
