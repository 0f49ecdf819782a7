//! # Request validation helpers
//!
//! Thin wrapper around the [`validator`](https://docs.rs/validator/) crate
//! for the handful of wire-level shape checks performed before a request
//! reaches a target handler (e.g. `ClientId`/`Username` must be non-blank).
//! Business-rule validation (schema/alias/attribute rules) belongs to the
//! target handlers themselves and is reported as
//! [`crate::errors::CognitoError::InvalidParameter`], not here.

use crate::errors::CognitoError;
use validator::Validate;

/// Validates a request DTO that implements `Validate`, mapping any failure
/// to `InvalidParameter` so it carries the same wire shape as every other
/// client-caused error.
pub fn validate_request<T: Validate>(data: &T) -> Result<(), CognitoError> {
    data.validate()
        .map_err(|errors| CognitoError::InvalidParameter(errors.to_string()))
}

pub mod validators {
    use validator::ValidationError;

    /// Validates that a string is not blank (empty or whitespace-only).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("blank"));
        }
        Ok(())
    }
}
