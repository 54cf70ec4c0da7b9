//! Validation helpers shared between DTOs and command handlers.

use validator::ValidationError;

/// Validates that a username is 1-15 alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_username("ada99")       // Ok
/// validate_username("")            // Err - empty
/// validate_username("ada lovelace") // Err - space
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() || username.len() > 15 {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!(
                "Username must be 1-15 characters (got {})",
                username.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("username_format");
        err.message = Some("Username must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Normalize a join code the way the lookup table stores it.
pub fn normalize_game_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("ada").is_ok());
        assert!(validate_username("Player1").is_ok());
        assert!(validate_username("abcdefghij12345").is_ok());
    }

    #[test]
    fn test_validate_username_invalid_length() {
        assert!(validate_username("").is_err());
        assert!(validate_username("abcdefghij123456").is_err()); // 16 chars
    }

    #[test]
    fn test_validate_username_invalid_format() {
        assert!(validate_username("ada lovelace").is_err()); // space
        assert!(validate_username("ada-99").is_err()); // punctuation
        assert!(validate_username("adä").is_err()); // non-ascii
    }

    #[test]
    fn test_normalize_game_code() {
        assert_eq!(normalize_game_code(" ab2cd3 "), "AB2CD3");
        assert_eq!(normalize_game_code("AB2CD3"), "AB2CD3");
    }
}
