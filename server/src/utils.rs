use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::models::User;

/// Canonical answer form: lowercase with everything but letters and digits
/// stripped. Applied to both the stored answer and the submission, so
/// "Echo!!" and "echo" compare equal.
pub fn normalize_answer(input: &str) -> String {
    let strip = Regex::new(r"[^a-z0-9]").unwrap();
    strip.replace_all(&input.to_lowercase(), "").into_owned()
}

/// Username slug: lowercase alphanumerics only, capped at 24 chars, with a
/// fallback so an all-punctuation name still yields something usable.
pub fn slugify_username(value: &str) -> String {
    let slug: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(24)
        .collect();
    if slug.is_empty() {
        "hunter".to_string()
    } else {
        slug
    }
}

/// English ordinal: 1st, 2nd, 3rd, 4th, ... 11th/12th/13th stay "th".
pub fn format_place(n: i64) -> String {
    let mod10 = n % 10;
    let mod100 = n % 100;
    if mod10 == 1 && mod100 != 11 {
        format!("{n}st")
    } else if mod10 == 2 && mod100 != 12 {
        format!("{n}nd")
    } else if mod10 == 3 && mod100 != 13 {
        format!("{n}rd")
    } else {
        format!("{n}th")
    }
}

/// Lenient integer parse for form fields; anything non-numeric becomes the
/// fallback.
pub fn parse_int(value: &str, fallback: i32) -> i32 {
    value.trim().parse().unwrap_or(fallback)
}

/// Gate unlock timestamps arrive from a `datetime-local` input
/// (`2026-10-31T18:00`, taken as UTC) or as RFC 3339.
pub fn parse_unlock_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Full name when present, otherwise the username.
pub fn display_name(user: &User) -> String {
    let first = user.first_name.as_deref().unwrap_or("").trim();
    let last = user.last_name.as_deref().unwrap_or("").trim();
    let full = format!("{first} {last}").trim().to_string();
    if full.is_empty() {
        user.username.clone()
    } else {
        full
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize_answer("Echo!!"), "echo");
        assert_eq!(normalize_answer("echo"), "echo");
        assert_eq!(normalize_answer("Grand Piano"), "grandpiano");
        assert_eq!(normalize_answer("  the-answer_42  "), "theanswer42");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_answer("A  Curious! Answer?");
        assert_eq!(normalize_answer(&once), once);
    }

    #[test]
    fn test_normalize_empty_and_symbols() {
        assert_eq!(normalize_answer(""), "");
        assert_eq!(normalize_answer("!@#$%^&*()"), "");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify_username("Mary O'Brien"), "maryobrien");
        assert_eq!(slugify_username("!!!"), "hunter");
        assert_eq!(
            slugify_username("averyveryverylongfirstandlastname"),
            "averyveryverylongfirstan"
        );
    }

    #[test]
    fn test_format_place() {
        assert_eq!(format_place(1), "1st");
        assert_eq!(format_place(2), "2nd");
        assert_eq!(format_place(3), "3rd");
        assert_eq!(format_place(4), "4th");
        assert_eq!(format_place(11), "11th");
        assert_eq!(format_place(12), "12th");
        assert_eq!(format_place(13), "13th");
        assert_eq!(format_place(21), "21st");
        assert_eq!(format_place(103), "103rd");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("7", 0), 7);
        assert_eq!(parse_int(" 2 ", 0), 2);
        assert_eq!(parse_int("nope", 1), 1);
        assert_eq!(parse_int("", 3), 3);
    }

    #[test]
    fn test_parse_unlock_at() {
        let parsed = parse_unlock_at("2026-10-31T18:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-10-31T18:00:00+00:00");

        let parsed = parse_unlock_at("2026-10-31T18:00:30Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-10-31T18:00:30+00:00");

        assert!(parse_unlock_at("halloween").is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = User {
            id: 1,
            username: "wanderer".to_string(),
            first_name: Some("  ".to_string()),
            last_name: None,
            house: "Anselm".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(display_name(&user), "wanderer");

        user.first_name = Some("Ada".to_string());
        user.last_name = Some("Lovelace".to_string());
        assert_eq!(display_name(&user), "Ada Lovelace");
    }
}
