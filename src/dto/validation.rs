//! Validation helpers for DTOs.

use validator::ValidationError;

/// Platform snowflakes are never zero.
pub fn validate_snowflake(id: &u64) -> Result<(), ValidationError> {
    if *id == 0 {
        let mut err = ValidationError::new("snowflake");
        err.message = Some("identifier must be a non-zero snowflake".into());
        return Err(err);
    }
    Ok(())
}
