//! Alert schedule expressions.
//!
//! Two forms are accepted:
//! - `@every <duration>` with h/m/s components, e.g. `@every 10s`,
//!   `@every 1h30m`
//! - cron, 5-field "MIN HOUR DOM MON DOW" or 6-field with a leading
//!   seconds field, with `*`, `*/N`, `N`, and comma lists in the
//!   second/minute/hour fields (day fields accept `*` only — rota
//!   reminders are time-of-day schedules)
//!
//! Parsing fails loudly at registration time so a typo in one rota's
//! config is reported once instead of silently never firing.

use chrono::{DateTime, Duration, Timelike, Utc};

/// A parsed, validated recurring schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    /// Fixed interval between firings.
    Every(Duration),
    /// Cron match sets, each sorted ascending. 5-field expressions get
    /// `seconds = [0]`.
    Cron {
        seconds: Vec<u32>,
        minutes: Vec<u32>,
        hours: Vec<u32>,
    },
}

impl Schedule {
    /// Parse a schedule expression. The error is the human-readable
    /// reason, reported verbatim to operators.
    pub fn parse(expression: &str) -> Result<Self, String> {
        let expr = expression.trim();

        if let Some(dur) = expr.strip_prefix("@every") {
            let dur = dur.trim();
            return parse_interval(dur)
                .map(Schedule::Every)
                .ok_or_else(|| format!("bad @every duration '{dur}'"));
        }

        let parts: Vec<&str> = expr.split_whitespace().collect();
        // 6 fields = leading seconds, 5 = minute-level.
        let time_fields = match parts.len() {
            5 => 2,
            6 => 3,
            _ => {
                return Err(format!(
                    "'{expr}' needs 5 or 6 cron fields ([SEC] MIN HOUR DOM MON DOW) \
                     or '@every <duration>'"
                ))
            }
        };
        let seconds = if time_fields == 3 {
            parse_field(parts[0], 0, 59)
                .ok_or_else(|| format!("bad second field '{}'", parts[0]))?
        } else {
            vec![0]
        };
        let minutes = parse_field(parts[time_fields - 2], 0, 59)
            .ok_or_else(|| format!("bad minute field '{}'", parts[time_fields - 2]))?;
        let hours = parse_field(parts[time_fields - 1], 0, 23)
            .ok_or_else(|| format!("bad hour field '{}'", parts[time_fields - 1]))?;
        for (i, field) in parts[time_fields..].iter().enumerate() {
            if *field != "*" {
                return Err(format!(
                    "field {} must be '*' ('{field}' given) — day-level cron is not supported",
                    time_fields + i + 1
                ));
            }
        }
        Ok(Schedule::Cron {
            seconds,
            minutes,
            hours,
        })
    }

    /// Compute the next firing instant strictly after `after`.
    pub fn next_run(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Every(interval) => Some(after + *interval),
            Schedule::Cron {
                seconds,
                minutes,
                hours,
            } => {
                // Scan from the top of the current minute so a later
                // second within it is still a candidate.
                let mut candidate = after
                    .with_second(0)
                    .unwrap_or(after)
                    .with_nanosecond(0)
                    .unwrap_or(after);

                // Time-of-day schedules repeat within 24h; scan 48h to
                // be safe around DST-free UTC day boundaries.
                for _ in 0..(48 * 60) {
                    if minutes.contains(&candidate.minute()) && hours.contains(&candidate.hour()) {
                        for &s in seconds {
                            let at = candidate + Duration::seconds(i64::from(s));
                            if at > after {
                                return Some(at);
                            }
                        }
                    }
                    candidate += Duration::minutes(1);
                }
                None
            }
        }
    }
}

/// Parse "1h30m", "10s", "90m" style interval strings.
fn parse_interval(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return None;
    }
    let mut total = Duration::zero();
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if digits.is_empty() {
                return None;
            }
            let value: i64 = digits.parse().ok()?;
            digits.clear();
            total = total
                + match c {
                    'h' => Duration::hours(value),
                    'm' => Duration::minutes(value),
                    's' => Duration::seconds(value),
                    _ => return None,
                };
        }
    }
    if !digits.is_empty() {
        // trailing number with no unit
        return None;
    }
    if total > Duration::zero() {
        Some(total)
    } else {
        None
    }
}

/// Parse a cron field into its set of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    if field.contains(',') {
        let vals: Result<Vec<u32>, _> = field.split(',').map(|s| s.trim().parse()).collect();
        let mut vals = vals.ok()?;
        if vals.iter().any(|v| *v < min || *v > max) {
            return None;
        }
        // next_run walks match sets in ascending order
        vals.sort_unstable();
        return Some(vals);
    }

    let n: u32 = field.parse().ok()?;
    if n >= min && n <= max {
        Some(vec![n])
    } else {
        None
    }
}
