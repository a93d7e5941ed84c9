//! Monotonic duration capture and wall-clock wire timestamps.
//!
//! Node start/end times and the trace duration are monotonic deltas from a
//! per-request baseline, in nanoseconds. Monotonic readings are only ever
//! differenced against the baseline from the same clock; they are never
//! converted to absolute timestamps. Wall-clock fields on the trace are
//! captured independently and split into whole seconds plus a sub-second
//! nanosecond remainder for the wire format.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use graphql_trace_proto::Timestamp;

/// Per-request clock: one wall-clock reading and one monotonic baseline,
/// captured together when the request starts.
#[derive(Debug, Clone, Copy)]
pub struct TraceTimer {
    wall_start: SystemTime,
    baseline: Instant,
}

impl TraceTimer {
    pub fn start() -> Self {
        TraceTimer {
            wall_start: SystemTime::now(),
            baseline: Instant::now(),
        }
    }

    /// Nanoseconds elapsed since the baseline, from the monotonic clock.
    ///
    /// Saturates at `u64::MAX` (a request lasting 500+ years).
    pub fn elapsed_ns(&self) -> u64 {
        u64::try_from(self.baseline.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Wall-clock time at the baseline, as a wire timestamp.
    pub fn wall_start(&self) -> Timestamp {
        timestamp_from(self.wall_start)
    }
}

/// Splits a wall-clock reading into the wire format's seconds + nanos pair.
/// Pre-epoch readings clamp to the epoch rather than fail.
pub fn timestamp_from(time: SystemTime) -> Timestamp {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => Timestamp {
            seconds: i64::try_from(since_epoch.as_secs()).unwrap_or(i64::MAX),
            nanos: i32::try_from(since_epoch.subsec_nanos()).unwrap_or(0),
        },
        Err(_) => Timestamp {
            seconds: 0,
            nanos: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_elapsed_is_monotonic() {
        let timer = TraceTimer::start();
        let first = timer.elapsed_ns();
        std::thread::sleep(Duration::from_millis(2));
        let second = timer.elapsed_ns();
        assert!(second > first);
        assert!(second >= 2_000_000);
    }

    #[test]
    fn test_timestamp_splits_seconds_and_nanos() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let ts = timestamp_from(time);
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 123_456_789);
    }

    #[test]
    fn test_pre_epoch_clamps_to_epoch() {
        let time = UNIX_EPOCH - Duration::from_secs(5);
        let ts = timestamp_from(time);
        assert_eq!(ts.seconds, 0);
        assert_eq!(ts.nanos, 0);
    }

    #[test]
    fn test_wall_start_is_current_era() {
        let timer = TraceTimer::start();
        // Sometime after 2023 and before the heat death of CI.
        assert!(timer.wall_start().seconds > 1_680_000_000);
    }
}
