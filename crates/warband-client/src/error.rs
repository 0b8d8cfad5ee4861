//! Error types for job submission.
//!
//! Only submission can fail from the caller's point of view. Failures of an
//! open status stream are delivered in-band as a terminal `error`
//! [`Frame`](warband::Frame) instead.
//!
//! ## Error Cases
//! - `InvalidRequest`: the request failed local validation and was not sent.
//! - `InvalidBaseUrl`: the configured optimizer address cannot be used.
//! - `Transport`: the HTTP exchange itself failed (connect, timeout, IO).
//! - `Rejected`: the optimizer answered with a non-2xx status.
//! - `MalformedResponse`: a 2xx answer did not carry a usable job id.

use warband::RequestError;

pub type Result<T, E = SubmissionError> = core::result::Result<T, E>;

/// Why a job could not be submitted.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("Invalid optimizer URL `{url}`")]
    InvalidBaseUrl { url: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Optimizer rejected the job with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed optimizer response: {reason}")]
    MalformedResponse { reason: String },
}
