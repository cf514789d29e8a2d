pub mod drink;

use serde::{Deserialize, Serialize};

pub const CODE_RESOURCE_NOT_FOUND: &str = "resource_not_found";
pub const CODE_VALIDATION_FAILED: &str = "validation_failed";
pub const CODE_INTERNAL_ERROR: &str = "internal_error";
pub const CODE_PAYLOAD_TOO_LARGE: &str = "payload_too_large";

pub const MESSAGE_RESOURCE_NOT_FOUND: &str = "resource not found";
pub const MESSAGE_VALIDATION_FAILED: &str = "unprocessable";
pub const MESSAGE_INTERNAL_ERROR: &str = "internal server error";
pub const MESSAGE_PAYLOAD_TOO_LARGE: &str = "payload too large";

/// Body of every successful listing, create and patch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: u64,
}

/// Body of every failed request. `error` repeats the HTTP status, `code` is
/// the machine readable reason.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub success: bool,
    pub version: String,
    pub timestamp: u64,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}
