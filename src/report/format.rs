//! Date and time formatting
//!
//! Every display string and every sort key is derived from one canonical
//! instant (`DateTime<Utc>`) parsed from the raw timestamp. Display strings
//! are never parsed back.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Marker rendered for a missing or unparseable timestamp
pub const INVALID_DATE: &str = "Invalid Date";

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Errors raised while reading locale or timezone settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported locale: {0}")]
    UnsupportedLocale(String),

    #[error("Invalid timezone '{0}': expected UTC or an offset like +02:00")]
    InvalidTimezone(String),
}

/// Supported display locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// `January 5, 2024` / `9:00:00 AM`
    #[default]
    EnUs,
    /// `5 January 2024` / `09:00:00`
    EnGb,
    /// `5 de enero de 2024` / `9:00:00`
    EsEs,
}

impl Locale {
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::EsEs => "es-ES",
        }
    }

    fn month_name(&self, month0: u32) -> &'static str {
        match self {
            Locale::EnUs | Locale::EnGb => MONTHS_EN[month0 as usize],
            Locale::EsEs => MONTHS_ES[month0 as usize],
        }
    }
}

impl FromStr for Locale {
    type Err = FormatError;

    /// Accepts BCP-47-ish tags and maps regional variants to the nearest
    /// supported locale (`es-AR` -> `es-ES`, `en` -> `en-US`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-").to_lowercase();
        let mut parts = normalized.split('-');
        let language = parts.next().unwrap_or_default();
        let region = parts.next();

        match (language, region) {
            ("en", Some("gb" | "ie" | "au" | "nz" | "in")) => Ok(Locale::EnGb),
            ("en", _) => Ok(Locale::EnUs),
            ("es", _) => Ok(Locale::EsEs),
            _ => Err(FormatError::UnsupportedLocale(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Timezone in which calendar days are cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneSetting(FixedOffset);

impl TimeZoneSetting {
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }
}

impl Default for TimeZoneSetting {
    fn default() -> Self {
        Self::utc()
    }
}

impl FromStr for TimeZoneSetting {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" || trimmed.is_empty() {
            return Ok(Self::utc());
        }

        let invalid = || FormatError::InvalidTimezone(s.to_string());

        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(invalid()),
        };

        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None if rest.len() == 4 && rest.is_char_boundary(2) => rest.split_at(2),
            None => (rest, "0"),
        };

        // Components are bare digits; `parse` alone would take a sign
        let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(hours) || !is_digits(minutes) {
            return Err(invalid());
        }

        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if hours > 14 || minutes > 59 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.local_minus_utc() == 0 {
            f.write_str("UTC")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Fixed locale/timezone formatting configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateFormatter {
    locale: Locale,
    timezone: TimeZoneSetting,
}

impl DateFormatter {
    pub fn new(locale: Locale, timezone: TimeZoneSetting) -> Self {
        Self { locale, timezone }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn timezone(&self) -> TimeZoneSetting {
        self.timezone
    }

    /// Long date, e.g. `January 5, 2024`
    pub fn format_date(&self, instant: Option<&DateTime<Utc>>) -> String {
        let Some(instant) = instant else {
            return INVALID_DATE.to_string();
        };
        let local = instant.with_timezone(&self.timezone.offset());
        let day = local.day();
        let month = self.locale.month_name(local.month0());
        let year = local.year();

        match self.locale {
            Locale::EnUs => format!("{} {}, {}", month, day, year),
            Locale::EnGb => format!("{} {} {}", day, month, year),
            Locale::EsEs => format!("{} de {} de {}", day, month, year),
        }
    }

    /// Hour, minute and second, e.g. `9:00:00 AM`
    pub fn format_time(&self, instant: Option<&DateTime<Utc>>) -> String {
        let Some(instant) = instant else {
            return INVALID_DATE.to_string();
        };
        let local = instant.with_timezone(&self.timezone.offset());

        match self.locale {
            Locale::EnUs => {
                let (pm, hour12) = local.hour12();
                format!(
                    "{}:{:02}:{:02} {}",
                    hour12,
                    local.minute(),
                    local.second(),
                    if pm { "PM" } else { "AM" }
                )
            }
            Locale::EnGb => format!(
                "{:02}:{:02}:{:02}",
                local.hour(),
                local.minute(),
                local.second()
            ),
            Locale::EsEs => format!(
                "{}:{:02}:{:02}",
                local.hour(),
                local.minute(),
                local.second()
            ),
        }
    }
}

/// Parse a raw timestamp field into an instant.
///
/// Strings may be RFC 3339, naive date-times (read as UTC) or bare dates
/// (UTC midnight). Numbers are epoch milliseconds. Objects with
/// `seconds`/`nanoseconds` (or `_seconds`/`_nanoseconds`) are Firestore
/// timestamps. Everything else yields `None`.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            if let Some(ms) = n.as_i64() {
                DateTime::from_timestamp_millis(ms)
            } else {
                n.as_f64()
                    .filter(|ms| ms.is_finite())
                    .and_then(|ms| DateTime::from_timestamp_millis(ms.trunc() as i64))
            }
        }
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

/// String form of [`parse_timestamp`]
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn instant(s: &str) -> DateTime<Utc> {
        parse_timestamp_str(s).unwrap()
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("en-US".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("en_GB".parse::<Locale>().unwrap(), Locale::EnGb);
        assert_eq!("es-AR".parse::<Locale>().unwrap(), Locale::EsEs);
        assert!(matches!(
            "fr-FR".parse::<Locale>(),
            Err(FormatError::UnsupportedLocale(_))
        ));
    }

    #[test]
    fn test_timezone_parsing() {
        assert_eq!("UTC".parse::<TimeZoneSetting>().unwrap(), TimeZoneSetting::utc());
        assert_eq!(
            "-03:00".parse::<TimeZoneSetting>().unwrap().offset().local_minus_utc(),
            -3 * 3600
        );
        assert_eq!(
            "+0530".parse::<TimeZoneSetting>().unwrap().offset().local_minus_utc(),
            5 * 3600 + 30 * 60
        );
        assert!("Europe/Madrid".parse::<TimeZoneSetting>().is_err());
        assert!("+25:00".parse::<TimeZoneSetting>().is_err());
    }

    #[test]
    fn test_timezone_rejects_malformed_components() {
        for input in ["+a\u{20ac}", "-\u{20ac}0", "+-5", "+05:-30", "+05:+30", "+", "+:30", "+05:"] {
            assert!(
                matches!(
                    input.parse::<TimeZoneSetting>(),
                    Err(FormatError::InvalidTimezone(_))
                ),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_format_date_per_locale() {
        let ts = instant("2024-01-05T10:00:00Z");
        let utc = TimeZoneSetting::utc();

        assert_eq!(
            DateFormatter::new(Locale::EnUs, utc).format_date(Some(&ts)),
            "January 5, 2024"
        );
        assert_eq!(
            DateFormatter::new(Locale::EnGb, utc).format_date(Some(&ts)),
            "5 January 2024"
        );
        assert_eq!(
            DateFormatter::new(Locale::EsEs, utc).format_date(Some(&ts)),
            "5 de enero de 2024"
        );
    }

    #[test]
    fn test_format_time_per_locale() {
        let utc = TimeZoneSetting::utc();
        let morning = instant("2024-01-05T09:05:07Z");
        let midnight = instant("2024-01-05T00:30:00Z");
        let evening = instant("2024-01-05T21:00:00Z");

        let us = DateFormatter::new(Locale::EnUs, utc);
        assert_eq!(us.format_time(Some(&morning)), "9:05:07 AM");
        assert_eq!(us.format_time(Some(&midnight)), "12:30:00 AM");
        assert_eq!(us.format_time(Some(&evening)), "9:00:00 PM");

        let gb = DateFormatter::new(Locale::EnGb, utc);
        assert_eq!(gb.format_time(Some(&morning)), "09:05:07");

        let es = DateFormatter::new(Locale::EsEs, utc);
        assert_eq!(es.format_time(Some(&morning)), "9:05:07");
    }

    #[test]
    fn test_timezone_moves_day_boundary() {
        let ts = instant("2024-01-06T01:30:00Z");
        let buenos_aires: TimeZoneSetting = "-03:00".parse().unwrap();
        let formatter = DateFormatter::new(Locale::EnUs, buenos_aires);

        assert_eq!(formatter.format_date(Some(&ts)), "January 5, 2024");
        assert_eq!(formatter.format_time(Some(&ts)), "10:30:00 PM");
    }

    #[test]
    fn test_invalid_marker() {
        let formatter = DateFormatter::default();
        assert_eq!(formatter.format_date(None), INVALID_DATE);
        assert_eq!(formatter.format_time(None), INVALID_DATE);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();

        assert_eq!(parse_timestamp(&json!("2024-01-05T10:00:00Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-01-05T07:00:00-03:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-01-05T10:00:00.000")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-01-05 10:00:00")), Some(expected));
        assert_eq!(
            parse_timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!({"seconds": expected.timestamp(), "nanoseconds": 0})),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!({"_seconds": expected.timestamp(), "_nanoseconds": 0})),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!("2024-01-05")),
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(&json!("not a date")), None);
        assert_eq!(parse_timestamp(&json!("")), None);
        assert_eq!(parse_timestamp(&json!("2024-13-45")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
        assert_eq!(parse_timestamp(&Value::Null), None);
        assert_eq!(parse_timestamp(&json!({"foo": 1})), None);
    }
}
