//! Validation of externally supplied identifiers.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

/// Longest aircraft model text accepted.
pub const MAX_MODEL_LEN: usize = 20;

lazy_static! {
    static ref IATA_CODE: Regex = Regex::new(r"^[A-Z0-9]{2,3}$").unwrap();
    static ref AIRCRAFT_MODEL: Regex = Regex::new(r"^[A-Za-z0-9\-\s\.\+]+$").unwrap();
}

/// Normalize and check an IATA carrier code.
///
/// Returns the trimmed, upper-cased code.
pub fn validate_iata_code(code: &str) -> Result<String, ValidationError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ValidationError::EmptyIataCode);
    }
    if !(2..=3).contains(&code.chars().count()) {
        return Err(ValidationError::IataLength(code));
    }
    if !IATA_CODE.is_match(&code) {
        return Err(ValidationError::IataCharacters(code));
    }
    Ok(code)
}

/// Check free-form aircraft model text. Returns the trimmed text.
pub fn validate_aircraft_model(model: &str) -> Result<String, ValidationError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(ValidationError::EmptyModel);
    }
    let len = model.chars().count();
    if len > MAX_MODEL_LEN {
        return Err(ValidationError::ModelTooLong(len));
    }
    if !AIRCRAFT_MODEL.is_match(model) || !model.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::ModelCharacters(model.to_string()));
    }
    Ok(model.to_string())
}
