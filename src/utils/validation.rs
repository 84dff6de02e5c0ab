use std::time::Duration;

use crate::quiz::error::QuizError;

/// Bounds accepted for a session's question count.
pub const MAX_QUESTIONS_PER_SESSION: usize = 30;
/// Telegram accepts poll open periods between 5 and 600 seconds.
pub const MIN_OPEN_PERIOD_SECS: u64 = 5;
pub const MAX_OPEN_PERIOD_SECS: u64 = 600;
pub const MIN_INTERVAL_SECS: u64 = 5;
pub const MAX_INTERVAL_SECS: u64 = 3600;
pub const MAX_ANNOUNCE_DELAY_SECS: u64 = 300;

pub fn validate_question_count(count: usize) -> Result<(), QuizError> {
    if count == 0 {
        return Err(QuizError::Configuration(
            "question count must be at least 1".to_string(),
        ));
    }
    if count > MAX_QUESTIONS_PER_SESSION {
        return Err(QuizError::Configuration(format!(
            "question count must be at most {MAX_QUESTIONS_PER_SESSION}"
        )));
    }
    Ok(())
}

pub fn validate_open_period(open_period: Duration) -> Result<(), QuizError> {
    let secs = open_period.as_secs();
    if !(MIN_OPEN_PERIOD_SECS..=MAX_OPEN_PERIOD_SECS).contains(&secs) {
        return Err(QuizError::Configuration(format!(
            "open period must be between {MIN_OPEN_PERIOD_SECS} and {MAX_OPEN_PERIOD_SECS} seconds"
        )));
    }
    Ok(())
}

pub fn validate_interval(interval: Duration) -> Result<(), QuizError> {
    let secs = interval.as_secs();
    if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs) {
        return Err(QuizError::Configuration(format!(
            "question interval must be between {MIN_INTERVAL_SECS} and {MAX_INTERVAL_SECS} seconds"
        )));
    }
    Ok(())
}

pub fn validate_announce_delay(delay: Duration) -> Result<(), QuizError> {
    if delay.as_secs() > MAX_ANNOUNCE_DELAY_SECS {
        return Err(QuizError::Configuration(format!(
            "announce delay must be at most {MAX_ANNOUNCE_DELAY_SECS} seconds"
        )));
    }
    Ok(())
}

/// Parses a `HH:MM` time-of-day argument for the daily trigger.
pub fn parse_daily_time(input: &str) -> Result<(u32, u32), QuizError> {
    let invalid = || QuizError::Configuration(format!("'{input}' is not a valid HH:MM time"));
    let (hour, minute) = input.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_count_bounds() {
        assert!(validate_question_count(0).is_err());
        assert!(validate_question_count(1).is_ok());
        assert!(validate_question_count(MAX_QUESTIONS_PER_SESSION).is_ok());
        assert!(validate_question_count(MAX_QUESTIONS_PER_SESSION + 1).is_err());
    }

    #[test]
    fn open_period_bounds() {
        assert!(validate_open_period(Duration::from_secs(4)).is_err());
        assert!(validate_open_period(Duration::from_secs(60)).is_ok());
        assert!(validate_open_period(Duration::from_secs(601)).is_err());
    }

    #[test]
    fn daily_time_parsing() {
        assert_eq!(parse_daily_time("9:30").ok(), Some((9, 30)));
        assert_eq!(parse_daily_time("23:59").ok(), Some((23, 59)));
        assert!(parse_daily_time("24:00").is_err());
        assert!(parse_daily_time("12:60").is_err());
        assert!(parse_daily_time("noon").is_err());
        assert!(parse_daily_time("12").is_err());
    }
}
