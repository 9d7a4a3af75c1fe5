//! Minimal ISO-8601 duration parser.
//! Supports: "PnYnMnWnDTnHnMnS" with any subset of components present.
//! Example: "P1DT12H" = one and a half days, "PT10S" = ten seconds.
//!
//! Years are treated as 365 days and months as 30 — rota durations are
//! days-to-weeks scale, where calendar drift does not matter.

use chrono::Duration;

/// Parse an ISO-8601 duration string into a `chrono::Duration`.
/// Returns `None` for anything malformed or for a zero-length result.
pub fn parse_iso8601(input: &str) -> Option<Duration> {
    let s = input.trim();
    let rest = s.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut total = Duration::zero();

    for (value, unit) in components(date_part)? {
        total = total
            + match unit {
                'Y' => Duration::days(value * 365),
                'M' => Duration::days(value * 30),
                'W' => Duration::weeks(value),
                'D' => Duration::days(value),
                _ => return None,
            };
    }

    for (value, unit) in components(time_part)? {
        total = total
            + match unit {
                'H' => Duration::hours(value),
                'M' => Duration::minutes(value),
                'S' => Duration::seconds(value),
                _ => return None,
            };
    }

    if total > Duration::zero() {
        Some(total)
    } else {
        None
    }
}

/// Split "3D" / "1H30M" style runs into (value, unit-letter) pairs.
fn components(part: &str) -> Option<Vec<(i64, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c.is_ascii_uppercase() {
            if digits.is_empty() {
                return None;
            }
            let value: i64 = digits.parse().ok()?;
            out.push((value, c));
            digits.clear();
        } else {
            return None;
        }
    }
    // Trailing digits without a unit letter
    if !digits.is_empty() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_only() {
        assert_eq!(parse_iso8601("PT10S"), Some(Duration::seconds(10)));
    }

    #[test]
    fn test_verbose_zero_components() {
        // The style the default rotas use
        assert_eq!(
            parse_iso8601("P0Y0DT0H0M10S"),
            Some(Duration::seconds(10))
        );
    }

    #[test]
    fn test_days_and_hours() {
        assert_eq!(
            parse_iso8601("P1DT12H"),
            Some(Duration::days(1) + Duration::hours(12))
        );
    }

    #[test]
    fn test_weeks() {
        assert_eq!(parse_iso8601("P1W"), Some(Duration::weeks(1)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_iso8601(""), None);
        assert_eq!(parse_iso8601("10S"), None);
        assert_eq!(parse_iso8601("P"), None);
        assert_eq!(parse_iso8601("PTS"), None);
        assert_eq!(parse_iso8601("PT10"), None);
        assert_eq!(parse_iso8601("PT10X"), None);
    }

    #[test]
    fn test_rejects_zero_duration() {
        assert_eq!(parse_iso8601("PT0S"), None);
        assert_eq!(parse_iso8601("P0D"), None);
    }
}
