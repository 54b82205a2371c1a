//! Time Engine - clock source and window countdown computation
//!
//! Every countdown shown on the sign is derived from the wall clock and a
//! repeating schedule of boundary minutes within the hour.

use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, Timelike, Utc};
use chrono_tz::Tz;

const SECONDS_PER_HOUR: i64 = 3600;

/// Remaining time below which the countdown starts blinking
pub const BLINK_THRESHOLD: Duration = Duration::from_secs(120);

/// Error type for clock reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// System time is earlier than the Unix epoch
    BeforeEpoch,
    /// System time cannot be represented as a calendar instant
    OutOfRange,
}

impl std::fmt::Display for ClockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockError::BeforeEpoch => write!(f, "System clock is set before the Unix epoch"),
            ClockError::OutOfRange => write!(f, "System clock is out of representable range"),
        }
    }
}

impl std::error::Error for ClockError {}

/// Supplies the current wall-clock time
pub trait ClockSource {
    fn now(&self) -> Result<DateTime<Utc>, ClockError>;
}

/// Reads the operating system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>, ClockError> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ClockError::BeforeEpoch)?;
        let secs = i64::try_from(since_epoch.as_secs()).map_err(|_| ClockError::OutOfRange)?;
        DateTime::from_timestamp(secs, since_epoch.subsec_nanos()).ok_or(ClockError::OutOfRange)
    }
}

/// A frozen clock for deterministic tests and replays
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Cell::new(instant),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.instant.set(instant);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.instant.set(self.instant.get() + by);
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> Result<DateTime<Utc>, ClockError> {
        Ok(self.instant.get())
    }
}

/// A repeating set of "time's up" boundaries within each hour
///
/// Boundary `b` means minute `b - 1`, second 59. Minutes are in `1..=60`,
/// so the top of the hour is written as 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSchedule {
    boundaries: &'static [u32],
    offset_minutes: u32,
}

impl WindowSchedule {
    /// Boundaries at :30 and :00
    pub const HALF_HOUR: WindowSchedule = WindowSchedule::new(&[30, 60]);
    /// Boundaries at :20, :40 and :00
    pub const TWENTY_MINUTE: WindowSchedule = WindowSchedule::new(&[20, 40, 60]);
    /// A 25 minute window followed by a 35 minute window
    pub const TWENTY_FIVE_THIRTY_FIVE: WindowSchedule = WindowSchedule::new(&[25, 60]);

    pub const fn new(boundaries: &'static [u32]) -> Self {
        assert!(!boundaries.is_empty(), "a window schedule needs at least one boundary");
        Self {
            boundaries,
            offset_minutes: 0,
        }
    }

    /// The same schedule moved later in the hour by `minutes`
    pub const fn shifted(self, minutes: u32) -> Self {
        Self {
            boundaries: self.boundaries,
            offset_minutes: (self.offset_minutes + minutes) % 60,
        }
    }

    /// Effective boundary minutes, each in `1..=60`
    pub fn boundary_minutes(&self) -> impl Iterator<Item = u32> + '_ {
        self.boundaries
            .iter()
            .map(move |b| (b + self.offset_minutes + 59) % 60 + 1)
    }
}

/// Result of a countdown computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Time until the nearest boundary
    pub remaining: Duration,
    /// True on odd seconds while less than two minutes remain
    pub blink_phase: bool,
}

impl Countdown {
    pub fn minutes(&self) -> u64 {
        self.remaining.as_secs() / 60
    }

    pub fn seconds(&self) -> u64 {
        self.remaining.as_secs() % 60
    }

    /// Format as "MM:SS"
    pub fn format(&self) -> String {
        format!("{:02}:{:02}", self.minutes(), self.seconds())
    }
}

/// Compute the time left until the nearest boundary of `schedule`
pub fn compute_countdown<T: Timelike>(now: &T, schedule: &WindowSchedule) -> Countdown {
    let second_of_hour = i64::from(now.minute() * 60 + now.second());

    let remaining_secs = schedule
        .boundary_minutes()
        .map(|b| {
            let landmark = i64::from(b - 1) * 60 + 59;
            (landmark - second_of_hour).rem_euclid(SECONDS_PER_HOUR)
        })
        .min()
        .unwrap_or(0);

    let remaining = Duration::from_secs(remaining_secs as u64);
    Countdown {
        remaining,
        blink_phase: remaining < BLINK_THRESHOLD && now.second() % 2 == 1,
    }
}

/// Format a span as "MM:SS" without wrapping the minutes
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Get the system's local timezone as a chrono-tz Tz
pub fn system_timezone() -> Option<Tz> {
    if let Some(tz) = std::env::var("TZ").ok().and_then(|name| name.parse::<Tz>().ok()) {
        return Some(tz);
    }
    // Abbreviations like "CET" only occasionally parse as IANA names
    let tz_name = Local::now().format("%Z").to_string();
    tz_name.parse::<Tz>().ok()
}

/// Parse a timezone string into a Tz
pub fn parse_timezone(tz_str: &str) -> Result<Tz, String> {
    tz_str
        .parse::<Tz>()
        .map_err(|_| format!("Invalid timezone: {}", tz_str))
}
