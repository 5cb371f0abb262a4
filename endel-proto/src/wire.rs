//! JSON wire format shared by the task file and the sync endpoint.
//!
//! The persisted file and the HTTP bodies use the same encoding: a
//! pretty-printed JSON array of [`Task`] records.

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Path of the fetch operation (`GET`).
pub const FETCH_PATH: &str = "/get_tareas";

/// Path of the replace-all operation (`POST`).
pub const REPLACE_PATH: &str = "/update_tareas";

/// Port the sync endpoint listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 5000;

/// Error type for collection encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload is not a JSON array of task records.
    #[error("malformed task collection: {0}")]
    Malformed(#[source] serde_json::Error),
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Encodes a task collection as pretty-printed UTF-8 JSON.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if serialization fails.
pub fn encode_collection(tasks: &[Task]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec_pretty(tasks).map_err(CodecError::Serialization)
}

/// Decodes a task collection.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if `bytes` is not a JSON array of
/// well-formed task records.
pub fn decode_collection(bytes: &[u8]) -> Result<Vec<Task>, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Malformed)
}

/// Acknowledgment body returned by the sync endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAck {
    /// `"ok"` on success, `"error"` otherwise.
    pub status: String,
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusAck {
    /// The success acknowledgment, `{"status":"ok"}`.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
        }
    }

    /// An error acknowledgment carrying a reason.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    /// Whether this is the success acknowledgment.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
