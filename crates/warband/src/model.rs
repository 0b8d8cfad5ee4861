//! Squad data model: identifiers, players, builds, groups and job state.

use crate::{CapabilityVector, capability::clamp_unit};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Maximum number of players in one subgroup.
pub const GROUP_CAPACITY: usize = 5;

/// Smallest squad [`SquadStore::initialize_squad`](crate::SquadStore::initialize_squad) accepts.
pub const MIN_SQUAD_SIZE: usize = 1;

/// Largest squad [`SquadStore::initialize_squad`](crate::SquadStore::initialize_squad) accepts.
pub const MAX_SQUAD_SIZE: usize = 50;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Identifier of a player, unique and stable for the session.
    PlayerId
);
define_id!(
    /// Identifier of a [`Build`] in the catalog.
    BuildId
);
define_id!(
    /// Identifier of a subgroup. Groups created by a resize are numbered from
    /// zero in id order.
    GroupId
);

/// Identifier the remote optimizer assigns to a submitted job.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Game mode a build is tuned for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Wvw,
    Pve,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wvw => "wvw",
            Self::Pve => "pve",
        })
    }
}

/// Immutable reference data describing one build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub profession: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub mode: Mode,
}

impl Build {
    pub fn new(
        id: BuildId,
        profession: impl Into<String>,
        specialization: impl Into<String>,
        mode: Mode,
    ) -> Self {
        Self {
            id,
            profession: profession.into(),
            specialization: specialization.into(),
            mode,
        }
    }
}

/// One squad member. Every mutation replaces the whole record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub build_id: BuildId,
    pub group_id: GroupId,
}

/// Which writer supplied a group's current coverage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageSource {
    /// Computed locally from the members' builds.
    #[default]
    Local,
    /// Adopted verbatim from the optimizer's latest result frame.
    Server,
}

/// A subgroup of at most [`GROUP_CAPACITY`] players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub player_ids: Vec<PlayerId>,
    pub coverage: CapabilityVector,
    pub coverage_source: CoverageSource,
}

impl Group {
    /// A group with the given members and zero coverage. Callers recompute
    /// coverage before exposing it.
    #[must_use]
    pub fn new(id: GroupId, player_ids: Vec<PlayerId>) -> Self {
        Self {
            id,
            player_ids,
            coverage: CapabilityVector::ZERO,
            coverage_source: CoverageSource::Local,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.player_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.player_ids.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.player_ids.len() >= GROUP_CAPACITY
    }

    #[must_use]
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.player_ids.contains(&player_id)
    }
}

/// Lifecycle of an optimization job as seen by the store.
///
/// `Idle` means no job has been started for the current squad. The last four
/// variants are terminal: once reached, further frames are ignored until a
/// new job begins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Queued,
    Running,
    #[serde(alias = "completed")]
    Complete,
    #[serde(alias = "canceled")]
    Cancelled,
    Timeout,
    Error,
}

impl JobStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Cancelled | Self::Timeout | Self::Error
        )
    }

    /// `true` while a job is queued or running.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::Error => "error",
        })
    }
}

/// Progress of the current optimization job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationJob {
    pub id: Option<JobId>,
    pub status: JobStatus,
    /// Best composition score reported so far, in `[0, 1]`.
    pub best_score: f64,
    pub elapsed_ms: u64,
}

impl OptimizationJob {
    /// A freshly submitted job.
    #[must_use]
    pub fn queued(id: JobId) -> Self {
        Self {
            id: Some(id),
            status: JobStatus::Queued,
            best_score: 0.0,
            elapsed_ms: 0,
        }
    }

    pub(crate) fn record_progress(&mut self, status: JobStatus, best_score: f64, elapsed_ms: u64) {
        self.status = status;
        self.best_score = clamp_unit(best_score);
        self.elapsed_ms = elapsed_ms;
    }
}

/// Owned, comparable copy of the whole store state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SquadSnapshot {
    /// Players in id order.
    pub players: Vec<Player>,
    /// Groups in id order.
    pub groups: Vec<Group>,
    pub job: OptimizationJob,
}

impl SquadSnapshot {
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.players[i])
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups
            .binary_search_by_key(&id, |g| g.id)
            .ok()
            .map(|i| &self.groups[i])
    }
}
