//! Human-readable time of day for log lines

use chrono::NaiveTime;

pub const SECS_PER_MINUTE: u64 = 60;
pub const SECS_PER_HOUR: u64 = 3_600;
pub const SECS_PER_DAY: u64 = 86_400;

/// Seconds after midnight for a 24-hour `hour:minute`
pub const fn clock_time(hour: u64, minute: u64) -> u64 {
    hour * SECS_PER_HOUR + minute * SECS_PER_MINUTE
}

/// Format simulated seconds after midnight as `HH:MM:SS AM/PM`
///
/// Times past midnight wrap around to the next day.
///
/// ```
/// use bank_queue::format_time_of_day;
///
/// assert_eq!(format_time_of_day(9 * 3600), "09:00:00 AM");
/// assert_eq!(format_time_of_day(16 * 3600 + 61), "04:01:01 PM");
/// ```
pub fn format_time_of_day(sim_secs: u64) -> String {
    let secs = (sim_secs % SECS_PER_DAY) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
        .map(|time| time.format("%I:%M:%S %p").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_time() {
        assert_eq!(clock_time(9, 0), 32_400);
        assert_eq!(clock_time(16, 0), 57_600);
        assert_eq!(clock_time(0, 4), 240);
    }

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!(format_time_of_day(0), "12:00:00 AM");
        assert_eq!(format_time_of_day(clock_time(12, 0)), "12:00:00 PM");
    }

    #[test]
    fn test_wraps_past_midnight() {
        assert_eq!(format_time_of_day(SECS_PER_DAY + 5), "12:00:05 AM");
    }

    #[test]
    fn test_closing_time() {
        assert_eq!(format_time_of_day(clock_time(16, 0)), "04:00:00 PM");
    }
}
