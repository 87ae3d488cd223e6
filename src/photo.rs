//! Photo descriptors as received from sources and their normalized form.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::clock::Clock;

/// A photo record as supplied by a description file or the inline list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawPhotoDescriptor {
    #[serde(default, deserialize_with = "lenient_scalar")]
    pub img: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    pub time_stamp: Option<String>,
}

impl RawPhotoDescriptor {
    pub fn new(img: impl Into<String>) -> Self {
        Self {
            img: Some(img.into()),
            ..Self::default()
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_time_stamp(mut self, time_stamp: impl Into<String>) -> Self {
        self.time_stamp = Some(time_stamp.into());
        self
    }
}

/// How a normalized photo obtained its `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampOrigin {
    Parsed,
    /// No `time_stamp` was supplied; normalized to the current time.
    Missing,
    /// `time_stamp` could not be parsed; normalized to the current time.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedPhoto {
    pub img: String,
    pub desc: String,
    /// The raw value as supplied, kept for display fallbacks.
    pub time_stamp: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub origin: TimestampOrigin,
}

impl NormalizedPhoto {
    /// Identifier used in diagnostics.
    pub fn label(&self) -> &str {
        label_of(&self.img, &self.desc)
    }
}

fn label_of<'a>(img: &'a str, desc: &'a str) -> &'a str {
    if !img.is_empty() {
        img
    } else if !desc.is_empty() {
        desc
    } else {
        "unknown"
    }
}

/// Resolve a raw descriptor into a display-ready record with a valid timestamp.
pub fn normalize(raw: RawPhotoDescriptor, clock: &Clock) -> NormalizedPhoto {
    let img = raw.img.unwrap_or_default();
    let desc = raw.desc.unwrap_or_default();
    let (timestamp, origin) = match raw.time_stamp.as_deref() {
        Some(value) => match parse_timestamp(value, clock) {
            Some(ts) => (ts, TimestampOrigin::Parsed),
            None => {
                warn!(
                    photo = label_of(&img, &desc),
                    received = value,
                    "invalid timestamp format; defaulting to current time"
                );
                (clock.now(), TimestampOrigin::Invalid)
            }
        },
        None => (clock.now(), TimestampOrigin::Missing),
    };
    NormalizedPhoto {
        img,
        desc,
        time_stamp: raw.time_stamp,
        timestamp,
        origin,
    }
}

/// Parse a timestamp the way the carousel understands them.
///
/// Zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` values are read as UTC. Other
/// zone-less date-times are wall-clock times in the clock's calendar zone,
/// and bare dates (`YYYY-MM-DD`, `YYYY-MM`, `YYYY`) are midnight UTC on the
/// first day they name.
pub fn parse_timestamp(value: &str, clock: &Clock) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let adjusted: Cow<'_, str> = if is_zoneless_iso(value) {
        Cow::Owned(format!("{value}Z"))
    } else {
        Cow::Borrowed(value)
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&adjusted) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| year_or_month(value))
    {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    for pattern in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return clock.resolve_local(&naive);
        }
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `YYYY` or `YYYY-MM`, as the first day of that year or month.
fn year_or_month(value: &str) -> Option<NaiveDate> {
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let (year, month) = value.split_once('-').unwrap_or((value, "01"));
    if year.len() != 4 || month.len() != 2 || !digits(year) || !digits(month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// `YYYY-MM-DDTHH:MM:SS` with optional fractional seconds and no zone marker.
fn is_zoneless_iso(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() < 19 {
        return false;
    }
    let (head, tail) = bytes.split_at(19);
    let shape_ok = head.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b'T',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return false;
    }
    match tail.split_first() {
        None => true,
        Some((b'.', digits)) => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
        Some(_) => false,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Accept strings, numbers and booleans; falsy values count as absent.
fn lenient_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Scalar::Bool(false)) | Some(Scalar::Int(0)) => None,
        Some(Scalar::Str(s)) if s.is_empty() => None,
        Some(Scalar::Float(f)) if f == 0.0 || f.is_nan() => None,
        Some(Scalar::Str(s)) => Some(s),
        Some(Scalar::Int(i)) => Some(i.to_string()),
        Some(Scalar::Float(f)) => Some(f.to_string()),
        Some(Scalar::Bool(true)) => Some("true".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::CalendarZone;
    use chrono::TimeZone;

    fn clock() -> Clock {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Clock::frozen(CalendarZone::Named(chrono_tz::Europe::Berlin), now)
    }

    #[test]
    fn zoneless_iso_is_read_as_utc() {
        let clock = clock();
        for raw in ["2024-01-01T10:00:00", "2024-01-01T10:00:00.250", "2023-12-31T23:59:59"] {
            let appended = parse_timestamp(&format!("{raw}Z"), &clock).unwrap();
            assert_eq!(parse_timestamp(raw, &clock), Some(appended), "{raw}");
        }
    }

    #[test]
    fn explicit_offsets_are_honoured() {
        let ts = parse_timestamp("2024-01-01T10:00:00+02:00", &clock()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn space_separated_time_is_calendar_local() {
        // Berlin is UTC+1 in January.
        let ts = parse_timestamp("2024-01-01 10:00:00", &clock()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn bare_date_is_utc_midnight() {
        let ts = parse_timestamp("2024-02-29", &clock()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn year_and_month_are_utc_first_days() {
        let clock = clock();
        assert_eq!(
            parse_timestamp("2024", &clock),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2023-07", &clock),
            Some(Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("2023-13", &clock), None);
        assert_eq!(parse_timestamp("202", &clock), None);

        let raw: RawPhotoDescriptor =
            serde_json::from_str(r#"{"img":"x.jpg","time_stamp":2024}"#).unwrap();
        let photo = normalize(raw, &clock);
        assert_eq!(photo.origin, TimestampOrigin::Parsed);
        assert_eq!(photo.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn shape_check_rejects_zoned_and_partial_values() {
        assert!(is_zoneless_iso("2024-01-01T10:00:00"));
        assert!(is_zoneless_iso("2024-01-01T10:00:00.5"));
        assert!(!is_zoneless_iso("2024-01-01T10:00:00Z"));
        assert!(!is_zoneless_iso("2024-01-01T10:00:00+01:00"));
        assert!(!is_zoneless_iso("2024-01-01T10:00:00."));
        assert!(!is_zoneless_iso("2024-01-01 10:00:00"));
    }

    #[test]
    fn invalid_timestamp_falls_back_to_now() {
        let clock = clock();
        let photo = normalize(
            RawPhotoDescriptor::new("a.jpg").with_time_stamp("yesterday-ish"),
            &clock,
        );
        assert_eq!(photo.timestamp, clock.now());
        assert_eq!(photo.origin, TimestampOrigin::Invalid);
        assert_eq!(photo.time_stamp.as_deref(), Some("yesterday-ish"));
    }

    #[test]
    fn missing_fields_default() {
        let clock = clock();
        let photo = normalize(RawPhotoDescriptor::default(), &clock);
        assert_eq!(photo.img, "");
        assert_eq!(photo.desc, "");
        assert_eq!(photo.label(), "unknown");
        assert_eq!(photo.origin, TimestampOrigin::Missing);
        assert_eq!(photo.timestamp, clock.now());
    }

    #[test]
    fn scalars_are_coerced() {
        let raw: RawPhotoDescriptor =
            serde_json::from_str(r#"{"img":"x.jpg","desc":null,"time_stamp":2024}"#).unwrap();
        assert_eq!(raw.desc, None);
        assert_eq!(raw.time_stamp.as_deref(), Some("2024"));

        let raw: RawPhotoDescriptor =
            serde_json::from_str(r#"{"img":"x.jpg","time_stamp":""}"#).unwrap();
        assert_eq!(raw.time_stamp, None);
    }
}
