//! Validation helpers for control request DTOs.

use validator::ValidationError;

/// Validates that a flag code is empty or exactly two ASCII letters.
///
/// # Examples
///
/// ```ignore
/// validate_flag_code("jp") // Ok
/// validate_flag_code("")   // Ok - clears the flag
/// validate_flag_code("jpn") // Err - too long
/// ```
pub fn validate_flag_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(());
    }

    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut err = ValidationError::new("flag_code_format");
        err.message = Some(format!("Flag code must be two letters (got `{code}`)").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_two_letters_or_nothing() {
        assert!(validate_flag_code("jp").is_ok());
        assert!(validate_flag_code("US").is_ok());
        assert!(validate_flag_code("").is_ok());
        assert!(validate_flag_code("  ").is_ok());
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(validate_flag_code("jpn").is_err());
        assert!(validate_flag_code("j").is_err());
        assert!(validate_flag_code("1a").is_err());
    }
}
