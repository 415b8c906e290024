//! Conversion between the wire timestamp format and the separate date/time
//! fields used by task forms.
//!
//! Wire timestamps look like `YYYY-MM-DDTHH:mm:ss` and carry no offset; they
//! are read as wall-clock time in the `offset` passed by the caller. Offsets
//! are always explicit so results do not depend on the host timezone.

use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Date and time as entered in a form: `YYYY-MM-DD` and `HH:mm`.
/// Both empty means "no due date".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalParts {
    pub date: String,
    pub time: String,
}

impl LocalParts {
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    pub fn to_wire(&self) -> Option<String> {
        to_wire(&self.date, &self.time)
    }
}

/// Parses a wire timestamp. Strings with an explicit offset (RFC 3339) keep
/// it; naive strings are placed in `offset`.
pub fn parse_wire(wire: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let wire = wire.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(wire) {
        return Some(dt);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(wire, fmt).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
}

/// Splits a wire timestamp into local date and time fields.
///
/// Absent input yields empty parts. Unparseable input is not expected here
/// (values come from the API or a passed validation); it also yields empty
/// parts and is logged.
pub fn to_local_parts(wire: Option<&str>, offset: FixedOffset) -> LocalParts {
    let Some(wire) = wire.filter(|w| !w.is_empty()) else {
        return LocalParts::default();
    };
    match parse_wire(wire, offset) {
        Some(dt) => {
            let local = dt.with_timezone(&offset);
            LocalParts {
                date: local.format(DATE_FORMAT).to_string(),
                time: local.format(TIME_FORMAT).to_string(),
            }
        }
        None => {
            warn!(wire, "unparseable timestamp, treating as no due date");
            LocalParts::default()
        }
    }
}

/// Joins form fields into a wire timestamp. An empty date means no due date;
/// an empty time means midnight.
pub fn to_wire(date: &str, time: &str) -> Option<String> {
    if date.is_empty() {
        return None;
    }
    let time = if time.is_empty() { "00:00" } else { time };
    Some(format!("{date}T{time}:00"))
}

/// Every time of day at `step_minutes` intervals, from `00:00` ascending.
/// A step of zero is treated as one minute.
pub fn build_time_options(step_minutes: u32) -> Vec<String> {
    let step = step_minutes.max(1) as usize;
    (0..MINUTES_PER_DAY)
        .step_by(step)
        .map(|m| format!("{:02}:{:02}", m / 60, m % 60))
        .collect()
}

/// Current time in `offset`.
pub fn local_now(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

/// Human-readable local rendering of a wire timestamp, e.g. `2024-05-01 09:30`.
pub fn display(wire: &str, offset: FixedOffset) -> Option<String> {
    parse_wire(wire, offset).map(|dt| {
        dt.with_timezone(&offset)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    })
}

/// Quick due-date shortcuts offered next to the due-date fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuePreset {
    Today18,
    Tomorrow09,
    NoDue,
}

impl DuePreset {
    pub fn apply(self, now: DateTime<FixedOffset>) -> LocalParts {
        let (day, hour) = match self {
            DuePreset::Today18 => (now.date_naive(), 18),
            DuePreset::Tomorrow09 => (now.date_naive() + Duration::days(1), 9),
            DuePreset::NoDue => return LocalParts::default(),
        };
        LocalParts {
            date: day.format(DATE_FORMAT).to_string(),
            time: format!("{hour:02}:00"),
        }
    }
}

impl FromStr for DuePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "today18" => Ok(DuePreset::Today18),
            "tomorrow" | "tomorrow09" => Ok(DuePreset::Tomorrow09),
            "none" | "no-due" | "nodue" => Ok(DuePreset::NoDue),
            other => Err(format!(
                "unknown due preset '{other}' (expected today18, tomorrow09 or none)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn plus_two() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    #[rstest]
    #[case("", "10:00", None)]
    #[case("", "", None)]
    #[case("2024-01-01", "", Some("2024-01-01T00:00:00"))]
    #[case("2024-01-01", "09:30", Some("2024-01-01T09:30:00"))]
    fn to_wire_cases(#[case] date: &str, #[case] time: &str, #[case] expected: Option<&str>) {
        assert_eq!(to_wire(date, time).as_deref(), expected);
    }

    #[test]
    fn absent_wire_gives_empty_parts() {
        assert_eq!(to_local_parts(None, utc()), LocalParts::default());
        assert_eq!(to_local_parts(Some(""), utc()), LocalParts::default());
    }

    #[test]
    fn naive_wire_is_wall_clock_in_any_offset() {
        let parts = to_local_parts(Some("2024-03-05T07:05:00"), plus_two());
        assert_eq!(parts, LocalParts::new("2024-03-05", "07:05"));
    }

    #[test]
    fn offset_wire_is_shifted_into_local_offset() {
        let parts = to_local_parts(Some("2024-03-05T23:30:00Z"), plus_two());
        assert_eq!(parts, LocalParts::new("2024-03-06", "01:30"));
    }

    #[test]
    fn garbage_wire_gives_empty_parts() {
        assert_eq!(to_local_parts(Some("not a date"), utc()), LocalParts::default());
    }

    #[test]
    fn half_hour_options() {
        let options = build_time_options(30);
        assert_eq!(options.len(), 48);
        assert_eq!(options.first().map(String::as_str), Some("00:00"));
        assert_eq!(options.last().map(String::as_str), Some("23:30"));
        assert!(options.windows(2).all(|w| w[0] < w[1]));
    }

    #[rstest]
    #[case(15, 96)]
    #[case(60, 24)]
    #[case(45, 32)]
    #[case(0, 1440)]
    #[case(2000, 1)]
    fn option_counts(#[case] step: u32, #[case] expected: usize) {
        assert_eq!(build_time_options(step).len(), expected);
    }

    #[test]
    fn presets_follow_local_day() {
        let now = plus_two().with_ymd_and_hms(2024, 12, 31, 23, 10, 0).unwrap();
        assert_eq!(DuePreset::Today18.apply(now), LocalParts::new("2024-12-31", "18:00"));
        assert_eq!(DuePreset::Tomorrow09.apply(now), LocalParts::new("2025-01-01", "09:00"));
        assert!(DuePreset::NoDue.apply(now).is_empty());
    }

    #[test]
    fn display_formats_minutes() {
        assert_eq!(
            display("2024-05-01T09:30:00", utc()).as_deref(),
            Some("2024-05-01 09:30")
        );
    }

    proptest! {
        #[test]
        fn wire_round_trips_at_minute_granularity(
            y in 1970i32..2100,
            mo in 1u32..=12,
            d in 1u32..=28,
            h in 0u32..24,
            mi in 0u32..60,
            offset_min in -720i32..=840,
        ) {
            let offset = FixedOffset::east_opt(offset_min * 60).unwrap();
            let wire = format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:00");
            let parts = to_local_parts(Some(&wire), offset);
            prop_assert_eq!(to_wire(&parts.date, &parts.time), Some(wire));
        }

        #[test]
        fn options_are_strictly_ascending(step in 1u32..=720) {
            let options = build_time_options(step);
            prop_assert_eq!(options.first().map(String::as_str), Some("00:00"));
            prop_assert!(options.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
