//! Response Envelope
//!
//! Every endpoint answers `{ success, data?, error?, isIdempotentReplay? }`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_idempotent_replay: Option<bool>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, is_idempotent_replay: None }
    }

    /// Write-endpoint envelope carrying the replay marker.
    pub fn write(data: T, is_replay: bool) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            is_idempotent_replay: Some(is_replay),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            is_idempotent_replay: None,
        }
    }
}
