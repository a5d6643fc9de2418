use chrono::Duration;

/// Render a run time given in seconds, e.g. `1:02:03.450` or `2:03.450`.
pub fn format_run_time(seconds: f64) -> String {
    let duration = Duration::milliseconds((seconds * 1000.0).round() as i64);
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    let secs = duration.num_seconds() % 60;
    let millis = duration.num_milliseconds() % 1000;

    match (hours, millis) {
        (0, 0) => format!("{}:{:02}", minutes, secs),
        (0, _) => format!("{}:{:02}.{:03}", minutes, secs, millis),
        (_, 0) => format!("{}:{:02}:{:02}", hours, minutes, secs),
        (_, _) => format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_times() {
        assert_eq!(format_run_time(90.5), "1:30.500");
        assert_eq!(format_run_time(59.0), "0:59");
        assert_eq!(format_run_time(3723.45), "1:02:03.450");
        assert_eq!(format_run_time(7200.0), "2:00:00");
    }
}
