use chrono::Utc;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use crate::error::ServicifyError;

static MONOTONIC_ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);

/// An instant read from a [`Clock`], either coarse (Unix milliseconds) or
/// fine (nanoseconds from an arbitrary fixed origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockInstant {
    Millis(i64),
    Nanos(u64),
}

pub trait Clock: Send + Sync {
    fn now(&self) -> ClockInstant;
}

/// Highest-resolution clock: monotonic nanoseconds since first use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> ClockInstant {
        ClockInstant::Nanos(MONOTONIC_ANCHOR.elapsed().as_nanos() as u64)
    }
}

/// Coarse wall clock in Unix milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MillisClock;

impl Clock for MillisClock {
    fn now(&self) -> ClockInstant {
        ClockInstant::Millis(Utc::now().timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub ClockInstant);

impl Clock for FixedClock {
    fn now(&self) -> ClockInstant {
        self.0
    }
}

/// Returns the given instants in order, then keeps repeating the last one.
#[derive(Debug)]
pub struct SequenceClock {
    instants: Mutex<VecDeque<ClockInstant>>,
}

impl SequenceClock {
    pub fn new(instants: impl IntoIterator<Item = ClockInstant>) -> Self {
        Self {
            instants: Mutex::new(instants.into_iter().collect()),
        }
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> ClockInstant {
        let mut instants = self
            .instants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match instants.len() {
            0 => ClockInstant::Millis(0),
            1 => instants[0],
            _ => instants.pop_front().unwrap_or(ClockInstant::Millis(0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableTiming {
    pub elapsed_millis: u64,
    /// Decimal string so it survives runtimes without wide integers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elapsed_nanos: Option<String>,
}

pub type NanosFormatter = dyn Fn(u64) -> String + Send + Sync;

/// Computes the time elapsed between `begin` and `end`, sampling `clock`
/// when `end` is absent. Nanosecond instants yield both figures, with
/// milliseconds floored; millisecond instants yield milliseconds only. A
/// negative span is reported as zero.
pub fn elapsed_time(
    begin: ClockInstant,
    end: Option<ClockInstant>,
    clock: &dyn Clock,
    formatter: Option<&NanosFormatter>,
) -> Result<PortableTiming, ServicifyError> {
    let end = end.unwrap_or_else(|| clock.now());

    match (begin, end) {
        (ClockInstant::Millis(begin), ClockInstant::Millis(end)) => Ok(PortableTiming {
            elapsed_millis: end.saturating_sub(begin).max(0) as u64,
            elapsed_nanos: None,
        }),
        (ClockInstant::Nanos(begin), ClockInstant::Nanos(end)) => {
            let nanos = end.saturating_sub(begin);
            Ok(PortableTiming {
                elapsed_millis: nanos / 1_000_000,
                elapsed_nanos: Some(match formatter {
                    Some(format) => format(nanos),
                    None => nanos.to_string(),
                }),
            })
        }
        _ => Err(ServicifyError::MixedClockUnits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_only() {
        let timing = elapsed_time(
            ClockInstant::Millis(1_000),
            Some(ClockInstant::Millis(1_250)),
            &SystemClock,
            None,
        )
        .unwrap();
        assert_eq!(timing.elapsed_millis, 250);
        assert_eq!(timing.elapsed_nanos, None);
    }

    #[test]
    fn test_nanos_floor_to_millis() {
        let timing = elapsed_time(
            ClockInstant::Nanos(0),
            Some(ClockInstant::Nanos(2_999_999)),
            &SystemClock,
            None,
        )
        .unwrap();
        assert_eq!(timing.elapsed_millis, 2);
        assert_eq!(timing.elapsed_nanos.as_deref(), Some("2999999"));
    }

    #[test]
    fn test_custom_nanos_formatter() {
        let suffixed = |n: u64| format!("{n}n");
        let timing = elapsed_time(
            ClockInstant::Nanos(10),
            Some(ClockInstant::Nanos(52)),
            &SystemClock,
            Some(&suffixed),
        )
        .unwrap();
        assert_eq!(timing.elapsed_nanos.as_deref(), Some("42n"));
    }

    #[test]
    fn test_end_sampled_from_clock() {
        let clock = FixedClock(ClockInstant::Millis(5_000));
        let timing = elapsed_time(ClockInstant::Millis(4_990), None, &clock, None).unwrap();
        assert_eq!(timing.elapsed_millis, 10);
    }

    #[test]
    fn test_negative_span_is_zero() {
        let timing = elapsed_time(
            ClockInstant::Millis(10),
            Some(ClockInstant::Millis(5)),
            &SystemClock,
            None,
        )
        .unwrap();
        assert_eq!(timing.elapsed_millis, 0);
    }

    #[test]
    fn test_mixed_units_rejected() {
        let err = elapsed_time(
            ClockInstant::Millis(0),
            Some(ClockInstant::Nanos(1)),
            &SystemClock,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ServicifyError::MixedClockUnits));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        match (a, b) {
            (ClockInstant::Nanos(a), ClockInstant::Nanos(b)) => assert!(b >= a),
            other => panic!("unexpected instants: {other:?}"),
        }
    }

    #[test]
    fn test_sequence_clock_repeats_last() {
        let clock = SequenceClock::new([ClockInstant::Millis(1), ClockInstant::Millis(2)]);
        assert_eq!(clock.now(), ClockInstant::Millis(1));
        assert_eq!(clock.now(), ClockInstant::Millis(2));
        assert_eq!(clock.now(), ClockInstant::Millis(2));
    }

    #[test]
    fn test_timing_serializes_camel_case() {
        let timing = PortableTiming {
            elapsed_millis: 3,
            elapsed_nanos: Some("3000001".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&timing).unwrap(),
            serde_json::json!({ "elapsedMillis": 3, "elapsedNanos": "3000001" })
        );
    }
}
