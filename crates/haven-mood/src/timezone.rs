use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::MoodError;

/// Which calendar a timestamp's day is computed in.
///
/// Never derived from the process's ambient timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimezonePolicy {
    #[default]
    Utc,
    Fixed(FixedOffset),
}

impl TimezonePolicy {
    fn offset_seconds(&self) -> i32 {
        match self {
            TimezonePolicy::Utc => 0,
            TimezonePolicy::Fixed(offset) => offset.local_minus_utc(),
        }
    }

    /// Calendar date containing `timestamp`
    pub fn day_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self {
            TimezonePolicy::Utc => timestamp.date_naive(),
            TimezonePolicy::Fixed(offset) => timestamp.with_timezone(offset).date_naive(),
        }
    }

    /// UTC instant at which `day` begins
    pub fn start_of(&self, day: NaiveDate) -> DateTime<Utc> {
        let local_midnight = day.and_time(NaiveTime::MIN);
        Utc.from_utc_datetime(&(local_midnight - Duration::seconds(self.offset_seconds() as i64)))
    }
}

impl FromStr for TimezonePolicy {
    type Err = MoodError;

    /// Accepts `utc` / `z` (any case) or a fixed offset like `+05:30`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
            return Ok(TimezonePolicy::Utc);
        }

        let invalid = || MoodError::validation("timezone", format!("unsupported timezone '{}'", s));

        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 {
            return Err(invalid());
        }
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(TimezonePolicy::Fixed)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for TimezonePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimezonePolicy::Utc => write!(f, "utc"),
            TimezonePolicy::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("UTC".parse::<TimezonePolicy>().unwrap(), TimezonePolicy::Utc);
        assert_eq!("z".parse::<TimezonePolicy>().unwrap(), TimezonePolicy::Utc);

        let ist = "+05:30".parse::<TimezonePolicy>().unwrap();
        assert_eq!(ist, TimezonePolicy::Fixed(FixedOffset::east_opt(19800).unwrap()));
        assert_eq!(ist.to_string(), "+05:30");

        let pst = "-08:00".parse::<TimezonePolicy>().unwrap();
        assert_eq!(pst, TimezonePolicy::Fixed(FixedOffset::west_opt(8 * 3600).unwrap()));

        for bad in ["Europe/Paris", "+5:30", "+05:60", "05:30", "+25:00", ""] {
            assert!(bad.parse::<TimezonePolicy>().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_day_of_near_midnight() {
        // 20:00 UTC on Mar 1 is already Mar 2 at +05:30
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let ist: TimezonePolicy = "+05:30".parse().unwrap();

        assert_eq!(TimezonePolicy::Utc.day_of(ts), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(ist.day_of(ts), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[test]
    fn test_start_of() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let ist: TimezonePolicy = "+05:30".parse().unwrap();

        assert_eq!(
            TimezonePolicy::Utc.start_of(day),
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(ist.start_of(day), Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).unwrap());
    }
}
