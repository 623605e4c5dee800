//! API request and response types

use serde::{Deserialize, Serialize};

/// Message-only response used by every mutating endpoint and by errors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasicResponse {
    pub message: String,
}

impl BasicResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
