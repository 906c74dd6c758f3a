//! Virtual replay clock.
//!
//! `Idle` until a range is configured, `Replaying` while the cursor is inside
//! it, `Exhausted` once it has moved past `end`. In live mode the clock ignores
//! the cursor and reports wall-clock UTC.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};

use super::error::ReplayError;
use super::timeframe::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Replaying,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeCursor {
    pub current: NaiveDateTime,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub frequency: Timeframe,
}

impl TimeCursor {
    pub fn step_size(&self) -> Duration {
        self.frequency.step()
    }
}

/// Read-only view of the clock for external reporting.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClockSnapshot {
    pub time: Option<NaiveDateTime>,
    pub is_on: bool,
    pub live: bool,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub frequency: Option<Timeframe>,
}

#[derive(Debug, Clone, Default)]
pub struct Clock {
    cursor: Option<TimeCursor>,
    exhausted: bool,
    live: bool,
}

/// Parse a replay bound. Tries, in order: datetime with fractional seconds,
/// datetime without, date only (taken as 23:59:59 of that day).
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, ReplayError> {
    let value = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .ok_or_else(|| ReplayError::InvalidDate {
            value: value.to_string(),
        })
}

fn is_weekend(ts: NaiveDateTime) -> bool {
    matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the bounds and frequency label, then start replaying from `start`.
    pub fn reset(&mut self, start: &str, end: &str, frequency: &str) -> Result<(), ReplayError> {
        let frequency: Timeframe = frequency.parse()?;
        let start = parse_datetime(start)?;
        let end = parse_datetime(end)?;
        self.configure(start, end, frequency)
    }

    /// Start replaying `start..=end`. Bounds are aligned to the step's calendar unit.
    pub fn configure(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        frequency: Timeframe,
    ) -> Result<(), ReplayError> {
        if start >= end {
            return Err(ReplayError::InvalidRange { start, end });
        }
        let start = frequency.align(start);
        let end = frequency.align(end);

        tracing::info!(%start, %end, %frequency, "replay configured");

        self.cursor = Some(TimeCursor {
            current: start,
            start,
            end,
            frequency,
        });
        self.exhausted = false;
        self.live = false;
        Ok(())
    }

    /// Drop the configured range and return to `Idle`.
    pub fn stop(&mut self) {
        self.cursor = None;
        self.exhausted = false;
    }

    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn state(&self) -> ClockState {
        match (&self.cursor, self.exhausted) {
            (None, _) => ClockState::Idle,
            (Some(_), true) => ClockState::Exhausted,
            (Some(_), false) => ClockState::Replaying,
        }
    }

    pub fn cursor(&self) -> Option<&TimeCursor> {
        self.cursor.as_ref()
    }

    pub fn frequency(&self) -> Option<Timeframe> {
        self.cursor.as_ref().map(|c| c.frequency)
    }

    /// Current time: wall clock when live, cursor position while replaying, `None` otherwise.
    pub fn time(&self) -> Option<NaiveDateTime> {
        if self.live {
            return Some(Utc::now().naive_utc());
        }
        match self.state() {
            ClockState::Replaying => self.cursor.as_ref().map(|c| c.current),
            ClockState::Idle | ClockState::Exhausted => None,
        }
    }

    /// Move one fixed step. See [`Clock::advance_with`].
    pub fn advance(&mut self) -> Option<NaiveDateTime> {
        self.advance_with(None)
    }

    /// Move the cursor forward and return the new time, `None` once the
    /// cursor has moved past `end`.
    ///
    /// On Saturday/Sunday the cursor jumps one day instead of one step. With
    /// a zero (tick) step the cursor moves to `next_event`, which must lie
    /// strictly after the current position.
    pub fn advance_with(&mut self, next_event: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        if self.live {
            return self.time();
        }
        if self.exhausted {
            return None;
        }
        let cursor = self.cursor.as_mut()?;

        let next = if is_weekend(cursor.current) {
            Some(cursor.current + Duration::days(1))
        } else if cursor.frequency.is_tick() {
            next_event.filter(|t| *t > cursor.current)
        } else {
            Some(cursor.current + cursor.step_size())
        };

        match next {
            Some(t) if t <= cursor.end => {
                cursor.current = t;
                Some(t)
            }
            Some(t) => {
                cursor.current = t;
                tracing::info!(end = %cursor.end, "replay exhausted");
                self.exhausted = true;
                None
            }
            None => {
                tracing::info!(at = %cursor.current, "no further events, replay exhausted");
                self.exhausted = true;
                None
            }
        }
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        let time = self.time();
        ClockSnapshot {
            time,
            is_on: self.live || time.is_some(),
            live: self.live,
            start_time: self.cursor.as_ref().map(|c| c.start),
            end_time: self.cursor.as_ref().map(|c| c.end),
            frequency: self.frequency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parse_with_fraction() {
        let parsed = parse_datetime("2024-01-15T10:30:05.250").unwrap();
        assert_eq!(parsed.with_nanosecond(0).unwrap(), dt(2024, 1, 15, 10, 30, 5));
        assert_eq!(parsed.nanosecond(), 250_000_000);
    }

    #[test]
    fn parse_without_fraction() {
        assert_eq!(
            parse_datetime("2024-01-15T10:30:05").unwrap(),
            dt(2024, 1, 15, 10, 30, 5)
        );
    }

    #[test]
    fn parse_date_only_is_end_of_day() {
        assert_eq!(
            parse_datetime("2024-01-15").unwrap(),
            dt(2024, 1, 15, 23, 59, 59)
        );
    }

    #[test]
    fn parse_rejects_other_formats() {
        let err = parse_datetime("15/01/2024").unwrap_err();
        assert!(matches!(err, ReplayError::InvalidDate { ref value } if value == "15/01/2024"));
    }

    #[test]
    fn idle_until_configured() {
        let clock = Clock::new();
        assert_eq!(clock.state(), ClockState::Idle);
        assert_eq!(clock.time(), None);
        assert!(!clock.snapshot().is_on);
    }

    #[test]
    fn reset_rejects_unknown_frequency() {
        let mut clock = Clock::new();
        let err = clock
            .reset("2024-01-15T00:00:00", "2024-01-16", "M7")
            .unwrap_err();
        assert!(matches!(err, ReplayError::UnsupportedFrequency { .. }));
        assert_eq!(clock.state(), ClockState::Idle);
    }

    #[test]
    fn reset_rejects_inverted_range() {
        let mut clock = Clock::new();
        let err = clock
            .reset("2024-01-16T00:00:00", "2024-01-15T00:00:00", "M1")
            .unwrap_err();
        assert!(matches!(err, ReplayError::InvalidRange { .. }));
    }

    #[test]
    fn reset_aligns_bounds_to_step() {
        let mut clock = Clock::new();
        clock
            .reset("2024-01-15T10:17:42", "2024-01-15", "H1")
            .unwrap();
        let cursor = clock.cursor().unwrap();
        assert_eq!(cursor.start, dt(2024, 1, 15, 10, 0, 0));
        assert_eq!(cursor.current, dt(2024, 1, 15, 10, 0, 0));
        assert_eq!(cursor.end, dt(2024, 1, 15, 23, 0, 0));
    }

    #[test]
    fn advance_steps_until_past_end() {
        let mut clock = Clock::new();
        clock
            .configure(dt(2024, 1, 15, 10, 0, 0), dt(2024, 1, 15, 10, 2, 0), Timeframe::M1)
            .unwrap();

        assert_eq!(clock.advance(), Some(dt(2024, 1, 15, 10, 1, 0)));
        assert_eq!(clock.advance(), Some(dt(2024, 1, 15, 10, 2, 0)));
        assert_eq!(clock.advance(), None);
        assert_eq!(clock.cursor().unwrap().current, dt(2024, 1, 15, 10, 3, 0));
        assert_eq!(clock.state(), ClockState::Exhausted);
        assert_eq!(clock.time(), None);
        assert_eq!(clock.advance(), None);
    }

    #[test]
    fn weekend_advances_by_whole_days() {
        let mut clock = Clock::new();
        // 2024-01-19 is a Friday.
        clock
            .configure(dt(2024, 1, 19, 23, 0, 0), dt(2024, 1, 23, 0, 0, 0), Timeframe::H4)
            .unwrap();

        assert_eq!(clock.advance(), Some(dt(2024, 1, 20, 3, 0, 0)));
        assert_eq!(clock.advance(), Some(dt(2024, 1, 21, 3, 0, 0)));
        assert_eq!(clock.advance(), Some(dt(2024, 1, 22, 3, 0, 0)));
        assert_eq!(clock.advance(), Some(dt(2024, 1, 22, 7, 0, 0)));
    }

    #[test]
    fn tick_frequency_follows_events() {
        let mut clock = Clock::new();
        clock
            .configure(dt(2024, 1, 15, 10, 0, 0), dt(2024, 1, 15, 11, 0, 0), Timeframe::Tick)
            .unwrap();

        assert_eq!(
            clock.advance_with(Some(dt(2024, 1, 15, 10, 0, 3))),
            Some(dt(2024, 1, 15, 10, 0, 3))
        );
        // An event that is not in the future is refused and ends the replay.
        assert_eq!(clock.advance_with(Some(dt(2024, 1, 15, 10, 0, 1))), None);
        assert_eq!(clock.state(), ClockState::Exhausted);
    }

    #[test]
    fn stop_returns_to_idle() {
        let mut clock = Clock::new();
        clock
            .reset("2024-01-15T10:00:00", "2024-01-15", "M5")
            .unwrap();
        assert_eq!(clock.state(), ClockState::Replaying);
        clock.stop();
        assert_eq!(clock.state(), ClockState::Idle);
        assert_eq!(clock.snapshot().start_time, None);
    }

    #[test]
    fn live_mode_reports_wall_clock() {
        let mut clock = Clock::new();
        clock.set_live(true);
        let before = Utc::now().naive_utc();
        let now = clock.time().unwrap();
        assert!(now >= before);
        let snapshot = clock.snapshot();
        assert!(snapshot.is_on);
        assert!(snapshot.live);
    }

    #[test]
    fn snapshot_reports_range() {
        let mut clock = Clock::new();
        clock
            .reset("2024-01-15T10:00:30", "2024-01-15T12:00:00", "M1")
            .unwrap();
        let snapshot = clock.snapshot();
        assert_eq!(snapshot.time, Some(dt(2024, 1, 15, 10, 0, 0)));
        assert_eq!(snapshot.start_time, Some(dt(2024, 1, 15, 10, 0, 0)));
        assert_eq!(snapshot.end_time, Some(dt(2024, 1, 15, 12, 0, 0)));
        assert_eq!(snapshot.frequency, Some(Timeframe::M1));
        assert!(snapshot.is_on);
    }
}
