use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Two-digit month codes and the labels used in rendered citations.
const MONTHS: [(&str, &str); 12] = [
    ("01", "Jan."),
    ("02", "Feb."),
    ("03", "Mar."),
    ("04", "Apr."),
    ("05", "May"),
    ("06", "Jun."),
    ("07", "Jul."),
    ("08", "Aug."),
    ("09", "Sep."),
    ("10", "Oct."),
    ("11", "Nov."),
    ("12", "Dec."),
];

/// A publication date reduced to whatever precision the source offered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DateParts {
    pub year: String,
    /// Month label such as `Aug.`, or empty.
    pub month: String,
    /// Two-digit day, or empty.
    pub day: String,
}

impl DateParts {
    pub fn new(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Self {
        DateParts {
            year: year.into(),
            month: month.into(),
            day: day.into(),
        }
    }

    /// Two-digit month code for the stored label.
    pub fn month_number(&self) -> Option<&'static str> {
        MONTHS
            .iter()
            .find(|(_, label)| *label == self.month)
            .map(|(code, _)| *code)
    }

    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, depending on the available precision.
    pub fn to_iso(&self) -> String {
        match (self.month_number(), self.day.is_empty()) {
            (Some(m), false) => format!("{}-{}-{}", self.year, m, self.day),
            (Some(m), true) => format!("{}-{}", self.year, m),
            (None, _) => self.year.clone(),
        }
    }
}

impl fmt::Display for DateParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [&self.day, &self.month, &self.year];
        let mut first = true;
        for p in parts.into_iter().filter(|p| !p.is_empty()) {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(p)?;
            first = false;
        }
        Ok(())
    }
}

struct Convention {
    year: &'static Lazy<Regex>,
    month: &'static Lazy<Regex>,
    day: &'static Lazy<Regex>,
}

static SLASH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2,4})/").unwrap());
static SLASH_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{2})").unwrap());
static SLASH_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{2}/(\d{2})").unwrap());
static HYPHEN_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2,4})-").unwrap());
static HYPHEN_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d{2})").unwrap());
static HYPHEN_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\d{2}-(\d{2})").unwrap());
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{4})\s*$").unwrap());

/// Slash first, hyphen second.
static CONVENTIONS: [Convention; 2] = [
    Convention {
        year: &SLASH_YEAR,
        month: &SLASH_MONTH,
        day: &SLASH_DAY,
    },
    Convention {
        year: &HYPHEN_YEAR,
        month: &HYPHEN_MONTH,
        day: &HYPHEN_DAY,
    },
];

/// Turn `YYYY/MM/DD` or `YYYY-MM-DD` (or a prefix of either) into [`DateParts`].
///
/// Only the year is mandatory. An unknown month or a missing day degrade to empty strings.
/// A lone four-digit year such as `"2021"` is accepted as a year-only date; anything else
/// without a delimited year token is a [`Error::DateParseError`].
pub fn normalize_date(raw: &str) -> Result<DateParts> {
    for conv in &CONVENTIONS {
        let Some(year) = first_capture(conv.year, raw) else {
            continue;
        };
        let month = first_capture(conv.month, raw)
            .and_then(month_label)
            .unwrap_or_default();
        let day = conv
            .day
            .captures_iter(raw)
            .last()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or_default();
        return Ok(DateParts::new(year, month, day));
    }

    if let Some(year) = first_capture(&BARE_YEAR, raw) {
        return Ok(DateParts::new(year, "", ""));
    }

    Err(Error::DateParseError(raw.to_string()))
}

fn first_capture<'a>(re: &Regex, s: &'a str) -> Option<&'a str> {
    re.captures(s).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn month_label(code: &str) -> Option<&'static str> {
    MONTHS.iter().find(|(c, _)| *c == code).map(|(_, l)| *l)
}
