use shared::error::ApiError;

/// Trims `value` and checks its length in characters against `min..=max`.
pub fn validate_length(value: &str, field: &str, min: usize, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        if len == 0 {
            return Err(ApiError::validation(field, "must be set"));
        }
        return Err(ApiError::validation(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    if len > max {
        return Err(ApiError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_username(value: &str, field: &str) -> Result<(), ApiError> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(
            field,
            "must only contain letters, digits and _ @ . -",
        ))
    }
}

pub fn validate_email(value: &str, field: &str) -> Result<(), ApiError> {
    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ApiError::validation(field, "must be an e-mail address"));
    };
    if local.is_empty() || domain.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(ApiError::validation(field, "must be an e-mail address"));
    }
    Ok(())
}
