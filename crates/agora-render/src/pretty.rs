use chrono::{DateTime, Utc};

/// Render `then` relative to `now`, e.g. "3 hours ago" or "Yesterday".
///
/// Timestamps in the future (clock skew between writers) render as "just now".
pub fn pretty_date(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(then);
    if diff < chrono::Duration::zero() {
        return "just now".to_string();
    }

    let seconds = diff.num_seconds();
    let days = diff.num_days();

    if days == 0 {
        return match seconds {
            0..10 => "just now".to_string(),
            10..60 => ago(seconds, "second"),
            60..120 => "a minute ago".to_string(),
            120..3600 => ago(seconds / 60, "minute"),
            3600..7200 => "an hour ago".to_string(),
            _ => ago(seconds / 3600, "hour"),
        };
    }

    match days {
        1 => "Yesterday".to_string(),
        2..7 => ago(days, "day"),
        7..31 => ago(days / 7, "week"),
        31..365 => ago(days / 30, "month"),
        _ => ago(days / 365, "year"),
    }
}

fn ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn render(back: Duration) -> String {
        pretty_date(now() - back, now())
    }

    #[test]
    fn within_a_minute() {
        assert_eq!(render(Duration::zero()), "just now");
        assert_eq!(render(Duration::seconds(9)), "just now");
        assert_eq!(render(Duration::seconds(10)), "10 seconds ago");
        assert_eq!(render(Duration::seconds(59)), "59 seconds ago");
    }

    #[test]
    fn minutes_and_hours() {
        assert_eq!(render(Duration::seconds(60)), "a minute ago");
        assert_eq!(render(Duration::seconds(119)), "a minute ago");
        assert_eq!(render(Duration::minutes(2)), "2 minutes ago");
        assert_eq!(render(Duration::minutes(59)), "59 minutes ago");
        assert_eq!(render(Duration::minutes(60)), "an hour ago");
        assert_eq!(render(Duration::hours(3)), "3 hours ago");
        assert_eq!(render(Duration::hours(23)), "23 hours ago");
    }

    #[test]
    fn days_weeks_months_years() {
        assert_eq!(render(Duration::hours(24)), "Yesterday");
        assert_eq!(render(Duration::hours(47)), "Yesterday");
        assert_eq!(render(Duration::days(2)), "2 days ago");
        assert_eq!(render(Duration::days(6)), "6 days ago");
        assert_eq!(render(Duration::days(7)), "1 week ago");
        assert_eq!(render(Duration::days(30)), "4 weeks ago");
        assert_eq!(render(Duration::days(31)), "1 month ago");
        assert_eq!(render(Duration::days(364)), "12 months ago");
        assert_eq!(render(Duration::days(365)), "1 year ago");
        assert_eq!(render(Duration::days(800)), "2 years ago");
    }

    #[test]
    fn future_timestamps_are_just_now() {
        assert_eq!(pretty_date(now() + Duration::hours(2), now()), "just now");
    }
}
