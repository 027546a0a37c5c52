use chrono::{Duration, NaiveDate};
use thiserror::Error;

/// Wire format for calendar dates.
pub const YMD_FORMAT: &str = "%Y-%m-%d";

/// Why a `YYYY-MM-DD` token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("expected a date shaped like YYYY-MM-DD, got {0:?}")]
    Shape(String),
    #[error("non-numeric {component} in date {token:?}")]
    NonNumeric {
        component: &'static str,
        token: String,
    },
    #[error("{0:?} is not a valid calendar date")]
    OutOfRange(String),
}

/// Parse a strict `YYYY-MM-DD` token.
///
/// Unlike `NaiveDate::parse_from_str`, this refuses unpadded components and
/// surrounding whitespace so every accepted token formats back to itself.
pub fn parse_ymd(token: &str) -> Result<NaiveDate, DateParseError> {
    let parts: Vec<&str> = token.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return Err(DateParseError::Shape(token.to_string()));
    };
    if year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return Err(DateParseError::Shape(token.to_string()));
    }

    let year = numeric(year, "year", token)?;
    let month = numeric(month, "month", token)?;
    let day = numeric(day, "day", token)?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| DateParseError::OutOfRange(token.to_string()))
}

fn numeric(part: &str, component: &'static str, token: &str) -> Result<u32, DateParseError> {
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateParseError::NonNumeric {
            component,
            token: token.to_string(),
        });
    }
    part.parse().map_err(|_| DateParseError::NonNumeric {
        component,
        token: token.to_string(),
    })
}

/// Format a date back into the wire format.
pub fn format_ymd(date: NaiveDate) -> String {
    date.format(YMD_FORMAT).to_string()
}

/// Whole days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Shift a date by `days`, saturating at the representable range.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = Duration::try_days(days).and_then(|d| date.checked_add_signed(d));
    match shifted {
        Some(d) => d,
        None if days < 0 => NaiveDate::MIN,
        None => NaiveDate::MAX,
    }
}

/// Serde helper for dates carried as `YYYY-MM-DD` strings.
pub mod ymd {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_ymd(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        super::parse_ymd(&token).map_err(serde::de::Error::custom)
    }
}
