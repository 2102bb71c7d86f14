use crate::error::PlanError;

pub const MIN_PERCENTAGE: u8 = 1;
pub const MAX_PERCENTAGE: u8 = 100;

/// Forces any integer into [1, 100]. Used for live edits, which never reject.
pub fn clamp_percentage(value: i64) -> u8 {
    value.clamp(MIN_PERCENTAGE as i64, MAX_PERCENTAGE as i64) as u8
}

/// Strict check used at submit time.
pub fn validate_percentage(value: i64) -> Result<u8, PlanError> {
    if (MIN_PERCENTAGE as i64..=MAX_PERCENTAGE as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(PlanError::OutOfRange {
            value: value.to_string(),
        })
    }
}

/// Parses a typed percentage such as "75" or "75%". Anything that is not a
/// whole number in [1, 100] is `OutOfRange`.
pub fn parse_percentage(raw: &str) -> Result<u8, PlanError> {
    let cleaned = raw.trim().trim_end_matches('%').trim();
    let out_of_range = || PlanError::OutOfRange {
        value: raw.trim().to_string(),
    };
    if cleaned.is_empty() {
        return Err(PlanError::MissingValue("percentage".to_string()));
    }
    let value: i64 = cleaned.parse().map_err(|_| out_of_range())?;
    validate_percentage(value).map_err(|_| out_of_range())
}

/// Interprets the contents of an input box after a keystroke. Non-digits are
/// dropped, the rest is clamped. An empty box means "unset".
pub fn parse_live_input(input: &str) -> Option<u8> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    // Overflowing digit strings are clamped like any other large value
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(clamp_percentage(value))
}
