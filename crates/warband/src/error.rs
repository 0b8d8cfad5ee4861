//! Error types for the squad engine.
//!
//! Rejections that the UI treats as ordinary outcomes (an invalid move, a
//! frame arriving after the job finished) are *not* errors; they are reported
//! through [`MoveOutcome`](crate::MoveOutcome) and
//! [`FrameOutcome`](crate::FrameOutcome). The types here cover the cases a
//! caller must handle explicitly.
//!
//! ## Error Cases
//! - [`StoreError`]: a squad resize was refused before any state changed.
//! - [`CatalogError`]: a build catalog could not be loaded.
//! - [`RequestError`]: an optimization request is malformed.
//! - [`AssignmentError`]: a result frame does not describe a valid partition
//!   of the current squad.

use crate::{BuildId, Capability, GroupId, Mode, PlayerId};

/// A result type defaulting to [`StoreError`].
pub type Result<T, E = StoreError> = core::result::Result<T, E>;

/// Errors returned by [`SquadStore`](crate::SquadStore) mutations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested squad size is outside the supported range.
    #[error("Squad size {size} is outside {min}..={max}")]
    SquadSize { size: usize, min: usize, max: usize },

    /// The catalog holds no builds to assign.
    #[error("Build catalog is empty")]
    EmptyCatalog,
}

/// Errors raised while loading a [`BuildCatalog`](crate::BuildCatalog).
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate build id {id}")]
    DuplicateBuild { id: BuildId },

    #[error("Malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reasons an [`OptimizeRequest`](crate::OptimizeRequest) is refused before
/// it is sent.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("Squad size {size} is outside {min}..={max}")]
    SquadSize { size: usize, min: usize, max: usize },

    #[error("Request lists {players} players for a squad of {squad_size}")]
    PlayerCountMismatch { players: usize, squad_size: usize },

    #[error("Player {player_id} is listed more than once")]
    DuplicatePlayer { player_id: PlayerId },

    #[error("Player {player_id} has no eligible builds")]
    NoEligibleBuilds { player_id: PlayerId },

    #[error("Player {player_id} references unknown build {build_id}")]
    UnknownBuild { player_id: PlayerId, build_id: BuildId },

    #[error("Unsupported mode `{mode}`")]
    UnsupportedMode { mode: Mode },

    #[error("Target for {capability} must be within 0..=1, got {value}")]
    InvalidTarget { capability: Capability, value: f64 },

    #[error("Weight for {capability} must be finite and non-negative, got {value}")]
    InvalidWeight { capability: Capability, value: f64 },
}

/// Reasons a result frame's assignment is refused as a whole.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("Group {group_id} appears more than once")]
    DuplicateGroup { group_id: GroupId },

    #[error("Group {group_id} holds {size} players")]
    GroupOverCapacity { group_id: GroupId, size: usize },

    #[error("Group {group_id} lists {players} players but {builds} builds")]
    BuildCountMismatch {
        group_id: GroupId,
        players: usize,
        builds: usize,
    },

    #[error("Unknown player {player_id}")]
    UnknownPlayer { player_id: PlayerId },

    #[error("Player {player_id} is assigned more than once")]
    DuplicatePlayer { player_id: PlayerId },

    #[error("{missing} players are left unassigned")]
    MissingPlayers { missing: usize },
}
