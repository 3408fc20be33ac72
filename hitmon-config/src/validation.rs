//! Custom validation functions for configuration.

use std::path::PathBuf;
use std::time::Duration;

use validator::ValidationError;

/// Buckets are one second wide, so store and query windows must be too.
pub fn validate_whole_seconds(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("must_be_non_zero"));
    }
    if value.subsec_nanos() != 0 {
        return Err(ValidationError::new("must_be_whole_seconds"));
    }
    Ok(())
}

/// Timer periods can be sub-second but a zero period would spin.
pub fn validate_non_zero(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        Err(ValidationError::new("must_be_non_zero"))
    } else {
        Ok(())
    }
}

#[allow(clippy::ptr_arg)]
pub fn validate_log_path(path: &PathBuf) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        Err(ValidationError::new("empty_log_path"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_seconds() {
        assert!(validate_whole_seconds(&Duration::from_secs(120)).is_ok());
        assert!(validate_whole_seconds(&Duration::from_millis(1500)).is_err());
        assert!(validate_whole_seconds(&Duration::ZERO).is_err());
    }

    #[test]
    fn non_zero() {
        assert!(validate_non_zero(&Duration::from_millis(250)).is_ok());
        assert!(validate_non_zero(&Duration::ZERO).is_err());
    }
}
