//! Wall clock and calendar zone used for timestamp fallbacks, age cutoffs and
//! display formatting.

use std::fmt;

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Calendar zone that defines "midnight" and naive wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarZone {
    /// The host's local zone.
    #[default]
    Local,
    Named(Tz),
}

impl fmt::Display for CalendarZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Named(tz) => write!(f, "{tz}"),
        }
    }
}

/// Source of "now", optionally frozen at a fixed instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    zone: CalendarZone,
    frozen: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new(zone: CalendarZone) -> Self {
        Self { zone, frozen: None }
    }

    /// A clock that always reports `now`.
    pub fn frozen(zone: CalendarZone, now: DateTime<Utc>) -> Self {
        Self {
            zone,
            frozen: Some(now),
        }
    }

    pub fn zone(&self) -> CalendarZone {
        self.zone
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.frozen.unwrap_or_else(Utc::now)
    }

    /// Midnight at the start of the calendar day `days` days before today.
    pub fn start_of_day_days_back(&self, days: u32) -> Option<DateTime<Utc>> {
        let now = self.now();
        match self.zone {
            CalendarZone::Local => midnight_days_back(now.with_timezone(&Local), days),
            CalendarZone::Named(tz) => midnight_days_back(now.with_timezone(&tz), days),
        }
    }

    /// Interpret a zone-less wall-clock time in the calendar zone.
    pub fn resolve_local(&self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.zone {
            CalendarZone::Local => resolve_in(&Local, naive),
            CalendarZone::Named(tz) => resolve_in(&tz, naive),
        }
    }

    /// Express an instant in the calendar zone for display.
    pub fn to_display(&self, ts: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self.zone {
            CalendarZone::Local => ts.with_timezone(&Local).fixed_offset(),
            CalendarZone::Named(tz) => ts.with_timezone(&tz).fixed_offset(),
        }
    }
}

fn midnight_days_back<Z: TimeZone>(now: DateTime<Z>, days: u32) -> Option<DateTime<Utc>> {
    let date = now
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days)))?;
    resolve_in(&now.timezone(), &date.and_time(NaiveTime::MIN))
}

fn resolve_in<Z: TimeZone>(zone: &Z, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    // Wall-clock times skipped by a DST jump resolve to the first valid instant after the gap.
    zone.from_local_datetime(naive)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(*naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}
