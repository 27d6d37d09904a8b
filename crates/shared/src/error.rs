use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error envelope the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

/// Failure taxonomy for one backend call: the transport never came back,
/// the server answered with an error status, or the body did not decode.
/// All three are handled identically by read flows (log, keep prior state),
/// but the distinction is preserved for logging and tests.
#[derive(Debug, Error)]
pub enum ApiFailure {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("undecodable backend response: {0}")]
    Decode(String),
}

impl ApiFailure {
    pub fn status(status: u16, body: Option<ApiErrorBody>) -> Self {
        Self::Status {
            status,
            detail: body
                .map(|b| b.detail)
                .unwrap_or_else(|| "no detail provided".to_string()),
        }
    }
}
