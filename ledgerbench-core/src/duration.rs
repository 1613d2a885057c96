use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("Invalid duration: \"{0}\" (use e.g. 10, 10s, 1m, 2h)")]
    Invalid(String),

    #[error("Duration \"{0}\" is too large")]
    Overflow(String),
}

/// Parse a whole-number duration with an optional `s`, `m` or `h` suffix. Bare numbers are
/// seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ParseDurationError> {
    let trimmed = value.trim().to_ascii_lowercase();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(ParseDurationError::Invalid(value.to_string()));
    }

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        _ => return Err(ParseDurationError::Invalid(value.to_string())),
    };

    let count: u64 = digits
        .parse()
        .map_err(|_| ParseDurationError::Overflow(value.to_string()))?;
    let secs = count
        .checked_mul(multiplier)
        .ok_or_else(|| ParseDurationError::Overflow(value.to_string()))?;

    Ok(Duration::from_secs(secs))
}
