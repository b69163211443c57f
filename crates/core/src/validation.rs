//! Input validation utilities.
//!
//! This module contains functions for validating configuration and request inputs before they
//! are used in operations.

use crate::{CoreError, CoreResult};

/// Validates that an upload limit is usable.
///
/// # Errors
///
/// Returns a `CoreError::InvalidInput` if the limit is zero.
pub fn validate_max_upload_bytes(max_upload_bytes: usize) -> CoreResult<()> {
    if max_upload_bytes == 0 {
        return Err(CoreError::InvalidInput(
            "max upload size must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Validates that an uploaded file is present and non-empty.
///
/// Returns the bytes unchanged when they are usable, `None` otherwise.
pub fn non_empty_upload(bytes: Option<Vec<u8>>) -> Option<Vec<u8>> {
    bytes.filter(|b| !b.is_empty())
}
