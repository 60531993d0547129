//! Fixed parsing culture for literals and record values.
//!
//! Number and date parsing never consults the process locale or time zone.
//! Numbers use the invariant format (`.` as decimal separator, no digit
//! grouping). "Local time" is defined by an explicit UTC offset.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use rust_decimal::Decimal;

/// Naive date/time layouts accepted after RFC 3339, tried in order.
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Date-only layout; parses to midnight.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parsing rules applied to filter literals and decoded records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Culture {
    utc_offset: FixedOffset,
}

impl Culture {
    /// Invariant culture with local time equal to UTC.
    pub fn invariant() -> Self {
        Self {
            utc_offset: Utc.fix(),
        }
    }

    /// Sets the offset that defines local time.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Parses an offset written as `+HH:MM`, `-HH:MM` or `Z`.
    pub fn parse_utc_offset(text: &str) -> Option<FixedOffset> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("z") {
            return Some(Utc.fix());
        }
        let (sign, rest) = match text.as_bytes().first()? {
            b'+' => (1, &text[1..]),
            b'-' => (-1, &text[1..]),
            _ => return None,
        };
        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None if rest.len() == 4 => rest.split_at(2),
            None => (rest, "0"),
        };
        let hours: i32 = hours.parse().ok()?;
        let minutes: i32 = minutes.parse().ok()?;
        if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
            return None;
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
    }

    /// Parses a date/time and normalizes it to local time.
    ///
    /// Text carrying an offset (RFC 3339) is converted to this culture's
    /// offset. Naive text is taken as already local.
    pub fn parse_datetime(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(self.to_local(dt));
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(dt);
            }
        }
        NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    }

    /// Converts an offset-aware timestamp to naive local time.
    pub fn to_local(&self, dt: DateTime<FixedOffset>) -> NaiveDateTime {
        dt.with_timezone(&self.utc_offset).naive_local()
    }

    /// Parses an exact decimal from its invariant textual form.
    ///
    /// Accepts plain (`2850.50`) and scientific (`2.8505e3`) notation.
    pub fn parse_decimal(&self, text: &str) -> Option<Decimal> {
        let text = text.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_rfc3339_converts_to_local() {
        let culture = Culture::invariant()
            .with_utc_offset(Culture::parse_utc_offset("+08:00").unwrap());

        let local = culture.parse_datetime("1986-10-08T16:00:00.000Z").unwrap();
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(1986, 10, 9).unwrap());
        assert_eq!(local.hour(), 0);
    }

    #[test]
    fn test_naive_forms_are_local() {
        let culture = Culture::invariant()
            .with_utc_offset(Culture::parse_utc_offset("-05:00").unwrap());

        let dt = culture.parse_datetime("2001-02-03T04:05:06").unwrap();
        assert_eq!(dt.hour(), 4);

        let dt = culture.parse_datetime("2001-02-03 04:05:06.250").unwrap();
        assert_eq!(dt.nanosecond(), 250_000_000);

        let midnight = culture.parse_datetime("2001-02-03").unwrap();
        assert_eq!(midnight.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_rejects_garbage() {
        let culture = Culture::invariant();
        assert!(culture.parse_datetime("yesterday").is_none());
        assert!(culture.parse_decimal("1,000.00").is_none());
    }

    #[test]
    fn test_decimal_is_exact() {
        let culture = Culture::invariant();
        let d = culture.parse_decimal("69.2").unwrap();
        assert_eq!(d.to_string(), "69.2");
        assert_eq!(culture.parse_decimal("2.8505e3").unwrap().to_string(), "2850.5");
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(Culture::parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(
            Culture::parse_utc_offset("+05:30").unwrap().local_minus_utc(),
            5 * 3600 + 30 * 60
        );
        assert!(Culture::parse_utc_offset("five").is_none());
    }
}
