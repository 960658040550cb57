use serde::{Deserialize, Serialize};

/// Uniform response wrapper used by every endpoint of the subscription API.
///
/// The API is assumed, not guaranteed, to answer with this shape. `data` is
/// only meaningful when `success` is true; `message` usually accompanies a
/// failure but may also carry a success note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Server message if one was sent and is non-empty, otherwise `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => fallback.to_string(),
        }
    }
}
