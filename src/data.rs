use std::{cmp::Ordering, fmt};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Placeholder tokens read as missing when loading delimited text.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Formats tried for the primary (structured) date parse. The first one that
/// accepts the leading non-missing cell is applied to the whole column.
pub const STRUCTURED_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub const STRUCTURED_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"];

// Month-first before day-first so ambiguous values read the US way.
const LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d %b %Y %H:%M",
    "%b %d %Y %H:%M",
];

const LENIENT_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m/%d/%y",
    "%d/%m/%y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%a, %d %b %Y",
    "%A, %B %d, %Y",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(f) => format_number(*f),
            Value::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::DateTime(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => (a + 0.0).total_cmp(&(b + 0.0)),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn is_missing_token(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// Reads a raw text cell, mapping placeholder tokens to missing.
pub fn text_cell(raw: &str) -> Option<Value> {
    if is_missing_token(raw) {
        None
    } else {
        Some(Value::Text(raw.to_string()))
    }
}

/// Parses a numeric cell. Thousands separators are accepted; anything that is
/// not a finite number yields `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = if trimmed.contains(',') {
        trimmed.replace(',', "")
    } else {
        trimmed.to_string()
    };
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Returns the first structured format (datetime or date) that accepts `value`.
pub fn detect_structured_format(value: &str) -> Option<&'static str> {
    let value = value.trim();
    STRUCTURED_DATETIME_FORMATS
        .iter()
        .find(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        .or_else(|| {
            STRUCTURED_DATE_FORMATS
                .iter()
                .find(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        })
        .copied()
}

/// Parses `value` with exactly one format, accepting date-only formats as midnight.
pub fn parse_with_format(value: &str, fmt: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, fmt)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, fmt)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Best-effort date parse used when the structured pass rejects a column.
pub fn parse_lenient_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.naive_local());
    }
    if let Some(fmt) = detect_structured_format(value) {
        return parse_with_format(value, fmt);
    }
    for fmt in LENIENT_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    LENIENT_DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(value, fmt)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    })
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Two-decimal rendering for aggregated money columns.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Rounds to the nearest whole number and inserts thousands separators.
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative && grouped != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn missing_tokens_become_none() {
        assert_eq!(text_cell("NA"), None);
        assert_eq!(text_cell("  "), None);
        assert_eq!(text_cell("North"), Some(Value::Text("North".into())));
    }

    #[test]
    fn parse_number_rejects_text_and_non_finite() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn structured_format_detection_prefers_datetime() {
        assert_eq!(
            detect_structured_format("2024-03-01 10:15:00"),
            Some("%Y-%m-%d %H:%M:%S")
        );
        assert_eq!(detect_structured_format("2024-03-01"), Some("%Y-%m-%d"));
        assert_eq!(detect_structured_format("1 Mar 2024"), None);
    }

    #[test]
    fn lenient_parse_handles_mixed_inputs() {
        let expected = at_midnight(2024, 3, 1);
        assert_eq!(parse_lenient_datetime("03/01/2024"), Some(expected));
        assert_eq!(parse_lenient_datetime("1 Mar 2024"), Some(expected));
        assert_eq!(parse_lenient_datetime("March 1, 2024"), Some(expected));
        assert_eq!(parse_lenient_datetime("20240301"), Some(expected));
        // Day-first only when month-first is impossible.
        assert_eq!(
            parse_lenient_datetime("13/01/2024"),
            Some(at_midnight(2024, 1, 13))
        );
        assert_eq!(parse_lenient_datetime("not a date"), None);
    }

    #[test]
    fn format_thousands_groups_digits() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(-4500.0), "-4,500");
    }

    #[test]
    fn mixed_values_order_by_kind() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Number(3.0),
            Value::Text("a".into()),
            Value::Number(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Number(-1.0),
                Value::Number(3.0),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ]
        );
    }

    #[test]
    fn signed_zeros_compare_equal() {
        let (pos, neg) = (Value::Number(0.0), Value::Number(-0.0));
        assert_eq!(pos, neg);
        assert_eq!(pos.cmp(&neg), Ordering::Equal);
        let keys = [pos, neg].into_iter().collect::<std::collections::BTreeSet<_>>();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn midnight_datetimes_display_as_dates() {
        assert_eq!(Value::DateTime(at_midnight(2024, 3, 1)).as_display(), "2024-03-01");
        assert_eq!(Value::Number(42.0).as_display(), "42");
        assert_eq!(Value::Number(2.5).as_display(), "2.5");
        assert_eq!(format_amount(2.126), "2.13");
    }
}
