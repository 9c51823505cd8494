//! Date helper functions

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::content::parse_timestamp;
use crate::i18n::Locale;

/// Format used on list and detail pages, e.g. `25 mar 2021`
pub const SHORT_DATE: &str = "DD MMM YYYY";

/// Format a date using a Moment.js-compatible format string and an explicit locale
///
/// Supported tokens: `YYYY YY MMMM MMM MM M DD D HH H mm m ss s`. Text inside
/// `[...]` is copied verbatim.
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", &pt_br) // -> "25 mar 2021"
/// ```
pub fn format_date<Z: TimeZone>(date: &DateTime<Z>, format: &str, locale: &Locale) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            match rest.find(']') {
                Some(end) => {
                    out.push_str(&rest[1..end]);
                    rest = &rest[end + 1..];
                }
                None => {
                    out.push_str(&rest[1..]);
                    rest = "";
                }
            }
            continue;
        }

        let token = TOKENS.iter().find(|t| rest.starts_with(**t));
        match token {
            Some(token) => {
                render_token(&mut out, token, date, locale);
                rest = &rest[token.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    out
}

/// Longest tokens first so `MMMM` wins over `MM`
const TOKENS: [&str; 14] = [
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "DD", "D", "HH", "H", "mm", "m", "ss", "s",
];

fn render_token<Z: TimeZone>(out: &mut String, token: &str, date: &DateTime<Z>, locale: &Locale) {
    use std::fmt::Write;

    // writing to a String cannot fail
    let _ = match token {
        "YYYY" => write!(out, "{:04}", date.year()),
        "YY" => write!(out, "{:02}", date.year().rem_euclid(100)),
        "MMMM" => write!(out, "{}", locale.month(date.month())),
        "MMM" => write!(out, "{}", locale.month_short(date.month())),
        "MM" => write!(out, "{:02}", date.month()),
        "M" => write!(out, "{}", date.month()),
        "DD" => write!(out, "{:02}", date.day()),
        "D" => write!(out, "{}", date.day()),
        "HH" => write!(out, "{:02}", date.hour()),
        "H" => write!(out, "{}", date.hour()),
        "mm" => write!(out, "{:02}", date.minute()),
        "m" => write!(out, "{}", date.minute()),
        "ss" => write!(out, "{:02}", date.second()),
        "s" => write!(out, "{}", date.second()),
        _ => write!(out, "{}", token),
    };
}

/// Formats publication dates in a fixed locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    format: String,
    locale: Locale,
    tz: Tz,
}

impl DateFormatter {
    pub fn new(format: &str, locale: Locale, tz: Tz) -> Self {
        Self {
            format: format.to_string(),
            locale,
            tz,
        }
    }

    /// Format an instant in the configured timezone
    pub fn format(&self, date: &DateTime<Utc>) -> String {
        format_date(&date.with_timezone(&self.tz), &self.format, &self.locale)
    }

    /// Format an optional publication date; `None` for never-published posts
    pub fn format_opt(&self, date: Option<&DateTime<Utc>>) -> Option<String> {
        date.map(|d| self.format(d))
    }

    /// Parse an ISO-8601 timestamp and format it
    pub fn format_iso(&self, iso: &str) -> Option<String> {
        parse_timestamp(Some(iso)).map(|d| self.format(&d))
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Z: TimeZone>(date: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
