//! HL7 `TS`/`DTM` timestamps.
//!
//! The same `YYYY[MM[DD[HH[MM[SS[.S+]]]]]][+/-ZZZZ]` layout is used by v2 messages and by CDA
//! (v3) documents, so the FHIR renderer reuses this module.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// How much of a timestamp was supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    Year(i32),
    Month(i32, u32),
    Day(NaiveDate),
    /// Date and time; seconds default to zero when omitted.
    Time(NaiveDateTime),
}

/// A parsed HL7 timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hl7Timestamp {
    pub precision: Precision,
    /// UTC offset as `+HH:MM`, when one was given.
    pub offset: Option<String>,
}

impl Hl7Timestamp {
    /// Parse an HL7 timestamp. Returns `None` for anything malformed or out of range.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (main, offset) = match value.find(['+', '-']) {
            Some(i) => (&value[..i], Some(parse_offset(&value[i..])?)),
            None => (value, None),
        };
        let main = main.split('.').next().unwrap_or_default();
        if main.is_empty() || !main.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let year: i32 = main.get(0..4)?.parse().ok()?;
        let precision = match main.len() {
            4 => Precision::Year(year),
            6 => {
                let month: u32 = main[4..6].parse().ok()?;
                if !(1..=12).contains(&month) {
                    return None;
                }
                Precision::Month(year, month)
            }
            8 => Precision::Day(NaiveDate::parse_from_str(main, "%Y%m%d").ok()?),
            10 | 12 | 14 => {
                let date = NaiveDate::parse_from_str(&main[..8], "%Y%m%d").ok()?;
                let hour: u32 = main[8..10].parse().ok()?;
                let minute: u32 = main.get(10..12).map_or(Some(0), |m| m.parse().ok())?;
                let second: u32 = main.get(12..14).map_or(Some(0), |s| s.parse().ok())?;
                let time = NaiveTime::from_hms_opt(hour, minute, second)?;
                Precision::Time(NaiveDateTime::new(date, time))
            }
            _ => return None,
        };

        Some(Self { precision, offset })
    }

    /// ISO 8601 text at the precision that was supplied.
    pub fn to_iso8601(&self) -> String {
        match self.precision {
            Precision::Time(dt) => {
                let base = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
                match &self.offset {
                    Some(offset) => format!("{base}{offset}"),
                    None => base,
                }
            }
            _ => self.date_part(),
        }
    }

    /// Date-only text (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
    pub fn date_part(&self) -> String {
        match self.precision {
            Precision::Year(y) => format!("{y:04}"),
            Precision::Month(y, m) => format!("{y:04}-{m:02}"),
            Precision::Day(d) => d.format("%Y-%m-%d").to_string(),
            Precision::Time(dt) => dt.format("%Y-%m-%d").to_string(),
        }
    }

    /// A value valid as a FHIR `dateTime`.
    ///
    /// FHIR requires an offset whenever a time is present, so times without one are reduced to
    /// their date.
    pub fn to_fhir_datetime(&self) -> String {
        match (&self.precision, &self.offset) {
            (Precision::Time(_), Some(_)) => self.to_iso8601(),
            _ => self.date_part(),
        }
    }
}

/// Convert an HL7 timestamp to ISO 8601, or return the input unchanged if it does not parse.
pub fn to_iso8601(value: &str) -> String {
    Hl7Timestamp::parse(value)
        .map(|ts| ts.to_iso8601())
        .unwrap_or_else(|| value.to_string())
}

fn parse_offset(offset: &str) -> Option<String> {
    let (sign, digits) = offset.split_at(1);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = digits[..2].parse().ok()?;
    let minutes: u32 = digits[2..].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(format!("{sign}{}:{}", &digits[..2], &digits[2..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_precision() {
        assert_eq!(to_iso8601("2024"), "2024");
        assert_eq!(to_iso8601("202403"), "2024-03");
        assert_eq!(to_iso8601("20240315"), "2024-03-15");
        assert_eq!(to_iso8601("2024031514"), "2024-03-15T14:00:00");
        assert_eq!(to_iso8601("202403151430"), "2024-03-15T14:30:00");
        assert_eq!(to_iso8601("20240315143005"), "2024-03-15T14:30:05");
    }

    #[test]
    fn keeps_offset_and_drops_fraction() {
        assert_eq!(
            to_iso8601("20240315143005.1234-0500"),
            "2024-03-15T14:30:05-05:00"
        );
        assert_eq!(to_iso8601("20240315143005+0100"), "2024-03-15T14:30:05+01:00");
    }

    #[test]
    fn malformed_values_pass_through() {
        assert_eq!(to_iso8601("20241340"), "20241340");
        assert_eq!(to_iso8601("not a date"), "not a date");
        assert_eq!(to_iso8601("2024031525"), "2024031525");
        assert!(Hl7Timestamp::parse("20240315+05").is_none());
        assert!(Hl7Timestamp::parse("").is_none());
    }

    #[test]
    fn fhir_datetime_requires_offset_for_times() {
        let with_offset = Hl7Timestamp::parse("20240315143005-0500").expect("valid");
        assert_eq!(with_offset.to_fhir_datetime(), "2024-03-15T14:30:05-05:00");
        let without = Hl7Timestamp::parse("20240315143005").expect("valid");
        assert_eq!(without.to_fhir_datetime(), "2024-03-15");
        let year = Hl7Timestamp::parse("1980").expect("valid");
        assert_eq!(year.to_fhir_datetime(), "1980");
    }
}
