//! Wire types for the optimizer's job-status stream.
//!
//! Each server-push message carries one [`Frame`]. Frames are applied with
//! overwrite semantics (see [`SquadStore::apply_frame`](crate::SquadStore::apply_frame)),
//! so no sequence number is carried or checked.

use crate::{BuildId, CapabilityVector, GroupId, JobStatus, PlayerId};
use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};

/// One message from a job's status stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Never `idle`: a frame always describes a submitted job.
    #[serde(deserialize_with = "submitted_status")]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "millis")]
    pub elapsed_ms: u64,
    #[serde(default, deserialize_with = "score")]
    pub best_score: f64,
    /// Full group assignment, present once the optimizer has a candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OptimizeResult>,
    /// Free-form explanation, usually attached to `error` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Frame {
    /// A status-only frame.
    #[must_use]
    pub fn progress(status: JobStatus, best_score: f64, elapsed_ms: u64) -> Self {
        Self {
            status,
            elapsed_ms,
            best_score,
            result: None,
            message: None,
        }
    }

    /// Terminal `error` frame synthesized locally when the transport fails.
    ///
    /// Progress figures are carried over from the last frame received so that
    /// applying it does not erase what the job had achieved.
    #[must_use]
    pub fn transport_error(best_score: f64, elapsed_ms: u64, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            elapsed_ms,
            best_score,
            result: None,
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn with_result(mut self, result: OptimizeResult) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Assignment computed by the optimizer.
///
/// `coverage_by_group` is parallel to `groups`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, deserialize_with = "score")]
    pub best_score: f64,
    #[serde(default, deserialize_with = "millis")]
    pub elapsed_ms: u64,
    #[serde(default)]
    pub groups: Vec<ResultGroup>,
    #[serde(default)]
    pub coverage_by_group: Vec<CapabilityVector>,
    /// Optimizer-specific diagnostics, kept opaque.
    #[serde(default)]
    pub diagnostics: serde_json::Value,
}

/// One group of an [`OptimizeResult`]. `builds[i]` is the build assigned to
/// `players[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultGroup {
    pub group_id: GroupId,
    pub players: Vec<PlayerId>,
    #[serde(default)]
    pub builds: Vec<BuildId>,
}

// The optimizer reports timings from a float clock; accept any non-negative
// number and null.
fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if raw.is_finite() && raw > 0.0 {
        Ok(raw.round() as u64)
    } else {
        Ok(0)
    }
}

fn submitted_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JobStatus, D::Error> {
    match JobStatus::deserialize(deserializer)? {
        JobStatus::Idle => Err(D::Error::invalid_value(
            Unexpected::Str("idle"),
            &"the status of a submitted job",
        )),
        status => Ok(status),
    }
}

fn score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
