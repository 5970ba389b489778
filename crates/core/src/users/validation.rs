use super::error::ValidationError;

/// Longest name accepted for a user.
pub const MAX_NAME_LEN: usize = 255;

/// Parses a caller-supplied user ID.
///
/// Surrounding whitespace is ignored; anything that is not a base-10
/// integer is rejected instead of being coerced.
pub fn parse_user_id(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidId(raw.to_string()))
}

/// Validates a user name before it is buffered or written.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(())
}
