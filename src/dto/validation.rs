//! Validation helpers for DTOs.

use serde::Deserialize;
use utoipa::IntoParams;
use validator::{Validate, ValidationError};

use crate::state::session::{BallNumber, MAX_BALL, MIN_BALL};

/// Path parameter naming a ball.
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct NumberPath {
    /// Ball number, 1 to 90.
    #[validate(range(min = MIN_BALL, max = MAX_BALL))]
    #[param(value_type = u8)]
    pub number: BallNumber,
}

/// Validates that an uploaded file name is usable as a label.
///
/// Rejects empty names and names containing path separators.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("file_name_empty");
        err.message = Some("File name must not be empty".into());
        return Err(err);
    }

    if name.contains(['/', '\\']) {
        let mut err = ValidationError::new("file_name_path");
        err.message = Some("File name must not contain path separators".into());
        return Err(err);
    }

    Ok(())
}
