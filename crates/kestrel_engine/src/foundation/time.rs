//! Time management utilities

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame) and return the new delta
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
        self.delta_time
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let running = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        self.elapsed + running
    }

    /// Get the elapsed time in microseconds
    pub fn elapsed_micros(&self) -> u64 {
        u64::try_from(self.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Local calendar fields read in a single refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateFields {
    /// Full year, e.g. 2024
    pub year: i32,
    /// Month 1..=12
    pub month: u32,
    /// Day of month 1..=31
    pub day: u32,
    /// Day of week, 0 = Sunday
    pub weekday: u32,
    /// Hours 0..=23
    pub hours: u32,
    /// Minutes 0..=59
    pub minutes: u32,
    /// Seconds 0..=59
    pub seconds: u32,
}

impl<Tz: TimeZone> From<&DateTime<Tz>> for DateFields {
    fn from(now: &DateTime<Tz>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            weekday: now.weekday().num_days_from_sunday(),
            hours: now.hour(),
            minutes: now.minute(),
            seconds: now.second(),
        }
    }
}

/// Wall-clock date and time for diagnostics and log stamps.
///
/// Every accessor refreshes from the system clock first. Calendar fields are
/// in the local time zone. Access goes through [`SysTime::global`], which
/// serialises callers.
#[derive(Debug)]
pub struct SysTime {
    now: DateTime<Local>,
}

impl Default for SysTime {
    fn default() -> Self {
        Self { now: Local::now() }
    }
}

static SYS_TIME: OnceLock<Mutex<SysTime>> = OnceLock::new();

impl SysTime {
    /// Lock the process-wide instance
    pub fn global() -> MutexGuard<'static, SysTime> {
        SYS_TIME
            .get_or_init(|| Mutex::new(SysTime::default()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&mut self) -> &DateTime<Local> {
        self.now = Local::now();
        &self.now
    }

    /// Seconds since the unix epoch, zero before it
    pub fn epoch_seconds(&mut self) -> u64 {
        u64::try_from(self.refresh().timestamp()).unwrap_or(0)
    }

    /// Current seconds 0..=59
    pub fn seconds(&mut self) -> u32 {
        self.refresh().second()
    }

    /// Current minutes 0..=59
    pub fn minutes(&mut self) -> u32 {
        self.refresh().minute()
    }

    /// Current hour 0..=23
    pub fn hours(&mut self) -> u32 {
        self.refresh().hour()
    }

    /// Current day of month
    pub fn day(&mut self) -> u32 {
        self.refresh().day()
    }

    /// Current month 1..=12
    pub fn month(&mut self) -> u32 {
        self.refresh().month()
    }

    /// Current year
    pub fn year(&mut self) -> i32 {
        self.refresh().year()
    }

    /// All fields from a single refresh
    pub fn fields(&mut self) -> DateFields {
        DateFields::from(self.refresh())
    }

    /// `HH:MM:SS`
    pub fn time_string(&mut self) -> String {
        self.refresh().format("%H:%M:%S").to_string()
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&mut self) -> String {
        self.refresh().format("%Y-%m-%d").to_string()
    }

    /// Zone offset from UTC, e.g. `+02:00`
    pub fn utc_offset(&mut self) -> String {
        self.refresh().format("%:z").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_fields_follow_local_zone() {
        let now = Local::now();
        let fields = SysTime::global().fields();
        // tolerate a tick across a minute boundary
        if fields.minutes == now.minute() {
            assert_eq!(fields.hours, now.hour());
            assert_eq!((fields.year, fields.month, fields.day), (now.year(), now.month(), now.day()));
        }
    }

    #[test]
    fn test_fields_from_fixed_offset() {
        let instant = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2000, 2, 29, 1, 30, 5)
            .unwrap();
        let fields = DateFields::from(&instant);
        assert_eq!((fields.year, fields.month, fields.day), (2000, 2, 29));
        assert_eq!((fields.hours, fields.minutes, fields.seconds), (1, 30, 5));
        assert_eq!(fields.weekday, 2); // Tuesday

        let utc = DateFields::from(&instant.with_timezone(&Utc));
        assert_eq!((utc.day, utc.hours), (28, 23));
    }

    #[test]
    fn test_global_refreshes_lazily() {
        let mut time = SysTime::global();
        assert!(time.year() >= 2023);
        assert_eq!(time.date_string().len(), 10);
        assert_eq!(time.time_string().len(), 8);
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut watch = Stopwatch::start_new();
        watch.stop();
        let first = watch.elapsed();
        assert_eq!(watch.elapsed(), first);
    }
}
