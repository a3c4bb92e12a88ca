//! Virtual time values and the process-wide tick-rate configuration.
//!
//! A [`VTime`] pairs a tick count with a secondary priority used to break ties
//! between events that land on the same tick. Ordering is lexicographic:
//! tick count first, priority second. The tick rate (how many ticks make up
//! one second) is process-wide configuration, set once at startup via
//! [`set_ticks_per_second`] and read by every conversion helper below.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Default resolution: 10^10 ticks per second, i.e. one tick every 0.1 ns.
const DEFAULT_TICKS_PER_SECOND: i64 = 10_000_000_000;

static TICKS_PER_SECOND: AtomicI64 = AtomicI64::new(DEFAULT_TICKS_PER_SECOND);
// f64 bit pattern of 1.0 / TICKS_PER_SECOND, kept in lockstep with TICKS_PER_SECOND.
static SECONDS_PER_TICK_BITS: AtomicU64 = AtomicU64::new(0);

fn seconds_per_tick_bits_for(ticks_per_second: i64) -> u64 {
    (1.0_f64 / ticks_per_second as f64).to_bits()
}

/// Replace the process-wide tick rate. This is a startup-only knob: calling
/// it while any [`crate::manager::EventManager`] is running has unspecified
/// effects on in-flight conversions.
pub fn set_ticks_per_second(ticks_per_second: i64) {
    TICKS_PER_SECOND.store(ticks_per_second, Ordering::SeqCst);
    SECONDS_PER_TICK_BITS.store(seconds_per_tick_bits_for(ticks_per_second), Ordering::SeqCst);
}

/// Current process-wide tick rate, in ticks per second.
pub fn ticks_per_second() -> i64 {
    TICKS_PER_SECOND.load(Ordering::SeqCst)
}

fn seconds_per_tick() -> f64 {
    let bits = SECONDS_PER_TICK_BITS.load(Ordering::SeqCst);
    if bits == 0 {
        // Not yet primed by an explicit set_ticks_per_second call.
        seconds_per_tick_bits_for(DEFAULT_TICKS_PER_SECOND);
        return 1.0 / DEFAULT_TICKS_PER_SECOND as f64;
    }
    f64::from_bits(bits)
}

/// Convert a tick count to seconds using the current tick rate.
pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 * seconds_per_tick()
}

/// Convert seconds to a tick count, rounding to the nearest tick.
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * ticks_per_second() as f64).round() as i64
}

/// Convert a microsecond duration to a tick count, rounding to the nearest tick.
pub fn microseconds_to_ticks(microseconds: f64) -> i64 {
    seconds_to_ticks(microseconds / 1_000_000.0)
}

/// A point (or duration) in virtual time: a tick count plus a tiebreak priority.
///
/// `Ord`/`PartialOrd` are derived, which gives exactly the lexicographic
/// `(ticks, pri)` order the engine relies on throughout: field declaration
/// order is significant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VTime {
    ticks: i64,
    pri: i64,
}

impl VTime {
    /// Build a time directly from a tick count and priority.
    pub const fn new(ticks: i64, pri: i64) -> Self {
        VTime { ticks, pri }
    }

    /// The zero instant: `(0, 0)`.
    pub const fn zero() -> Self {
        VTime::new(0, 0)
    }

    /// A sentinel later than any real event time.
    pub const fn infinity() -> Self {
        VTime::new(i64::MAX, i64::MAX)
    }

    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    pub const fn pri(&self) -> i64 {
        self.pri
    }

    pub fn set_ticks(&mut self, ticks: i64) {
        self.ticks = ticks;
    }

    pub fn set_pri(&mut self, pri: i64) {
        self.pri = pri;
    }

    pub fn seconds(&self) -> f64 {
        ticks_to_seconds(self.ticks)
    }

    /// Build a time from a seconds value, rounding to the nearest tick, with priority 0.
    pub fn from_seconds(seconds: f64) -> Self {
        VTime::new(seconds_to_ticks(seconds), 0)
    }

    /// Build a time from a seconds value and an explicit priority.
    pub fn from_seconds_pri(seconds: f64, pri: i64) -> Self {
        VTime::new(seconds_to_ticks(seconds), pri)
    }

    /// Build a time from a microsecond duration, with priority 0.
    pub fn from_microseconds(microseconds: f64) -> Self {
        VTime::new(microseconds_to_ticks(microseconds), 0)
    }

    /// Add two times: tick counts sum, priority takes the larger of the two.
    ///
    /// The priority rule is "dominant wins" rather than "sum": a caller
    /// adding an offset to the current time wants the offset's priority to
    /// matter, not some combination of the two.
    pub fn plus(&self, other: &VTime) -> VTime {
        VTime::new(self.ticks + other.ticks, self.pri.max(other.pri))
    }

    /// `"(ticks,pri)"`, matching the engine's plain tick-count display.
    pub fn time_str(&self) -> String {
        format!("({},{})", self.ticks, self.pri)
    }

    /// `"(seconds,pri)"`, with seconds rendered in scientific notation.
    pub fn seconds_str(&self) -> String {
        format!("({:e},{})", self.seconds(), self.pri)
    }
}

impl std::fmt::Display for VTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.time_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // Tick rate is process-wide global state; serialize tests that touch it.
    static TEST_GUARD: StdMutex<()> = StdMutex::new(());

    #[test]
    fn default_tick_rate_round_trips() {
        let _g = TEST_GUARD.lock().unwrap();
        set_ticks_per_second(DEFAULT_TICKS_PER_SECOND);
        let ticks = seconds_to_ticks(1.0);
        assert_eq!(ticks, DEFAULT_TICKS_PER_SECOND);
        assert!((ticks_to_seconds(ticks) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn set_ticks_per_second_changes_conversions() {
        let _g = TEST_GUARD.lock().unwrap();
        set_ticks_per_second(1_000_000);
        assert_eq!(seconds_to_ticks(1.0), 1_000_000);
        assert_eq!(microseconds_to_ticks(1.0), 1);
        set_ticks_per_second(DEFAULT_TICKS_PER_SECOND);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let t1 = VTime::new(5, 1);
        let t2 = VTime::new(5, 2);
        let t3 = VTime::new(6, 1);
        assert!(t1 < t2);
        assert!(t2 < t3);
        assert!(t1 < t3);
        assert_eq!(t1.cmp(&t1), std::cmp::Ordering::Equal);
    }

    #[test]
    fn plus_takes_dominant_priority() {
        let t1 = VTime::new(5, 3);
        let t2 = VTime::new(7, 2);
        let sum = t1.plus(&t2);
        assert_eq!(sum.ticks(), 12);
        assert_eq!(sum.pri(), 3);

        let sum2 = t2.plus(&t1);
        assert_eq!(sum2.pri(), 3);
    }

    #[test]
    fn zero_and_infinity() {
        let z = VTime::zero();
        assert_eq!(z.ticks(), 0);
        assert_eq!(z.pri(), 0);

        let inf = VTime::infinity();
        assert_eq!(inf.ticks(), i64::MAX);
        assert_eq!(inf.pri(), i64::MAX);
    }

    #[test]
    fn time_str_formats_ticks_and_pri() {
        let t = VTime::new(20, 5);
        assert_eq!(t.time_str(), "(20,5)");
    }
}
