//! The reconciliation store.
//!
//! [`SquadStore`] is the single source of truth for a squad. Two writers
//! touch it:
//!
//! - **Result frames** from the optimizer ([`SquadStore::apply_frame`]). A
//!   frame carrying a result replaces group membership wholesale and brings
//!   the optimizer's own coverage figures along.
//! - **Local moves** ([`SquadStore::move_player`]). A move recomputes the
//!   coverage of the two groups it touched from the capability model.
//!
//! Conflicts are resolved by scope rather than by timestamp: the latest
//! frame always owns membership, and a move owns the coverage of the groups
//! it touched until the next frame. Whichever of the two last touched a
//! group supplies that group's whole view; fields are never merged.
//!
//! Every mutation leaves the groups as an exact partition of the players.

#[cfg(test)]
mod tests;

use crate::{
    AssignmentError, BuildCatalog, CapabilityModel, CapabilityVector, CoverageSource, Frame,
    GROUP_CAPACITY, Group, GroupId, JobId, JobOptions, JobStatus, MAX_SQUAD_SIZE, MIN_SQUAD_SIZE,
    OptimizationJob, OptimizeRequest, OptimizeResult, Player, PlayerId, RequestPlayer, Result,
    SquadSnapshot, StoreError, compute_group_coverage,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Result of [`SquadStore::move_player`].
///
/// Every variant other than [`MoveOutcome::Moved`] is a rejected drop: the
/// store is left exactly as it was.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: GroupId, to: GroupId },
    UnknownPlayer,
    UnknownGroup,
    AlreadyInGroup,
    GroupFull,
}

impl MoveOutcome {
    #[must_use]
    pub const fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Result of [`SquadStore::apply_frame`].
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The job already reached a terminal status; nothing changed.
    Ignored,
    /// Progress fields were updated; the frame carried no result.
    Progress,
    /// Progress fields were updated and membership replaced by the result.
    Reassigned,
    /// Progress fields were updated but the result was refused, leaving
    /// membership untouched.
    ResultRejected(AssignmentError),
}

/// Checks that `size` is an accepted squad size.
///
/// # Errors
///
/// Returns [`StoreError::SquadSize`] when `size` is outside `1..=50`.
pub const fn validate_squad_size(size: usize) -> Result<()> {
    if size < MIN_SQUAD_SIZE || size > MAX_SQUAD_SIZE {
        return Err(StoreError::SquadSize {
            size,
            min: MIN_SQUAD_SIZE,
            max: MAX_SQUAD_SIZE,
        });
    }
    Ok(())
}

/// Canonical, mutable model of a squad and its optimization job.
///
/// The store is a plain state machine: every method is synchronous and takes
/// `&mut self` when it mutates. Sharing between an async stream consumer and
/// other callers is the owner's concern.
#[derive(Clone, Debug)]
pub struct SquadStore {
    model: Arc<CapabilityModel>,
    builds: Arc<BuildCatalog>,
    players: BTreeMap<PlayerId, Player>,
    /// Sorted by id.
    groups: Vec<Group>,
    job: OptimizationJob,
}

impl SquadStore {
    /// Creates an empty store (no players, no groups, job `idle`).
    pub fn new(model: Arc<CapabilityModel>, builds: Arc<BuildCatalog>) -> Self {
        Self {
            model,
            builds,
            players: BTreeMap::new(),
            groups: Vec::new(),
            job: OptimizationJob::default(),
        }
    }

    /// (Re)creates the squad with `size` players and partitions it into
    /// groups of at most five, in id order.
    ///
    /// Players get ids `1..=size`, named `Player <id>`. Builds are assigned
    /// round-robin over `builds` in id order, and `builds` becomes the
    /// session catalog. Group `k` (zero-based id) receives the players whose
    /// zero-based index lies in `[5k, 5k + 5)`. Coverage is recomputed for
    /// every group and the job returns to `idle`.
    ///
    /// # Errors
    ///
    /// Nothing is mutated when an error is returned:
    /// - [`StoreError::SquadSize`] if `size` is outside `1..=50`.
    /// - [`StoreError::EmptyCatalog`] if `builds` is empty.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, builds), fields(builds = builds.len()))
    )]
    pub fn initialize_squad(&mut self, size: usize, builds: Arc<BuildCatalog>) -> Result<()> {
        validate_squad_size(size)?;
        let build_ids: Vec<_> = builds.ids().collect();
        if build_ids.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }

        let player_ids: Vec<PlayerId> = (1..=size as u32).map(PlayerId).collect();
        self.players = player_ids
            .iter()
            .enumerate()
            .map(|(index, &id)| {
                let player = Player {
                    id,
                    name: format!("Player {id}"),
                    build_id: build_ids[index % build_ids.len()],
                    group_id: GroupId((index / GROUP_CAPACITY) as u32),
                };
                (id, player)
            })
            .collect();
        self.groups = player_ids
            .chunks(GROUP_CAPACITY)
            .enumerate()
            .map(|(k, members)| Group::new(GroupId(k as u32), members.to_vec()))
            .collect();
        self.builds = builds;
        self.job = OptimizationJob::default();
        self.recalculate_coverage();

        #[cfg(feature = "tracing")]
        tracing::debug!(groups = self.groups.len(), "Squad initialized");
        Ok(())
    }

    /// Records a freshly submitted job: status `queued`, progress reset.
    ///
    /// Always accepted; starting a job retires whatever job came before.
    pub fn begin_job(&mut self, job_id: JobId) {
        #[cfg(feature = "tracing")]
        tracing::debug!(job_id = %job_id, previous = %self.job.status, "Job queued");
        self.job = OptimizationJob::queued(job_id);
    }

    /// Marks the job as failed because submission did not succeed.
    ///
    /// The failed attempt has no job id, so whatever the previous job
    /// reported is cleared.
    pub fn fail_submission(&mut self) {
        self.job = OptimizationJob {
            status: JobStatus::Error,
            ..OptimizationJob::default()
        };
    }

    /// Returns the job to `idle` without touching the squad.
    pub fn reset_job(&mut self) {
        self.job = OptimizationJob::default();
    }

    /// Merges one stream frame into the store.
    ///
    /// Frames arriving after a terminal status are ignored. Otherwise
    /// `status`, `best_score` and `elapsed_ms` are overwritten from the
    /// frame. A carried result that forms a valid partition of the current
    /// players replaces membership and builds wholesale and installs the
    /// optimizer's per-group coverage as-is. Groups without a server vector
    /// fall back to local computation.
    ///
    /// Applying the same frame twice leaves the store as applying it once.
    pub fn apply_frame(&mut self, frame: &Frame) -> FrameOutcome {
        if self.job.status.is_terminal() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                status = %self.job.status,
                incoming = %frame.status,
                "Ignoring frame after terminal status"
            );
            return FrameOutcome::Ignored;
        }

        self.job
            .record_progress(frame.status, frame.best_score, frame.elapsed_ms);

        let Some(result) = frame.result.as_ref() else {
            return FrameOutcome::Progress;
        };

        match self.check_assignment(result) {
            Ok(()) => {
                self.adopt_assignment(result);
                FrameOutcome::Reassigned
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Rejecting optimizer assignment: {e}");
                FrameOutcome::ResultRejected(e)
            }
        }
    }

    /// Moves `player_id` into `target` as an optimistic local edit.
    ///
    /// Rejected without any change when the player or group does not exist,
    /// the player already sits in `target`, or `target` already holds five
    /// players. On success the player is appended to `target` and the
    /// coverage of both the source and target groups is recomputed locally,
    /// superseding any server-provided figures for those two groups.
    pub fn move_player(&mut self, player_id: PlayerId, target: GroupId) -> MoveOutcome {
        let outcome = self.try_move(player_id, target);
        #[cfg(feature = "tracing")]
        {
            if !outcome.is_moved() {
                tracing::debug!(%player_id, %target, ?outcome, "Move rejected");
            }
        }
        outcome
    }

    fn try_move(&mut self, player_id: PlayerId, target: GroupId) -> MoveOutcome {
        let Some(target_idx) = self.group_index(target) else {
            return MoveOutcome::UnknownGroup;
        };
        let Some(player) = self.players.get(&player_id) else {
            return MoveOutcome::UnknownPlayer;
        };
        if player.group_id == target || self.groups[target_idx].contains(player_id) {
            return MoveOutcome::AlreadyInGroup;
        }
        if self.groups[target_idx].is_full() {
            return MoveOutcome::GroupFull;
        }

        let from = player.group_id;
        let moved = Player {
            group_id: target,
            ..player.clone()
        };
        self.players.insert(player_id, moved);

        let source_idx = self.groups.iter().position(|g| g.contains(player_id));
        if let Some(idx) = source_idx {
            self.groups[idx].player_ids.retain(|id| *id != player_id);
        }
        self.groups[target_idx].player_ids.push(player_id);

        self.refresh_local(target_idx);
        if let Some(idx) = source_idx {
            self.refresh_local(idx);
        }

        MoveOutcome::Moved { from, to: target }
    }

    /// Recomputes every group's coverage from the capability model.
    ///
    /// Idempotent. Discards any server-provided coverage.
    pub fn recalculate_coverage(&mut self) {
        for idx in 0..self.groups.len() {
            self.refresh_local(idx);
        }
    }

    /// Builds the `POST /optimize` body for the current squad.
    ///
    /// Each player is eligible for every catalog build of `options.mode`; if
    /// the catalog has none in that mode the player's current build is used.
    #[must_use]
    pub fn optimize_request(&self, options: &JobOptions) -> OptimizeRequest {
        let eligible: Vec<_> = self.builds.in_mode(options.mode).map(|b| b.id).collect();
        let players = self
            .players
            .values()
            .map(|p| RequestPlayer {
                id: p.id,
                name: p.name.clone(),
                eligible_build_ids: if eligible.is_empty() {
                    vec![p.build_id]
                } else {
                    eligible.clone()
                },
            })
            .collect();

        OptimizeRequest {
            players,
            builds: self.builds.iter().cloned().collect(),
            mode: options.mode,
            squad_size: self.players.len(),
            time_limit_ms: options.time_limit_ms,
            targets: options.targets.clone(),
            weights: options.weights.clone(),
        }
    }

    /// Owned copy of the whole state, players and groups in id order.
    #[must_use]
    pub fn snapshot(&self) -> SquadSnapshot {
        SquadSnapshot {
            players: self.players.values().cloned().collect(),
            groups: self.groups.clone(),
            job: self.job.clone(),
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Groups in id order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.group_index(id).map(|idx| &self.groups[idx])
    }

    #[must_use]
    pub fn job(&self) -> &OptimizationJob {
        &self.job
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<BuildCatalog> {
        &self.builds
    }

    #[must_use]
    pub fn model(&self) -> &Arc<CapabilityModel> {
        &self.model
    }

    fn group_index(&self, id: GroupId) -> Option<usize> {
        self.groups.binary_search_by_key(&id, |g| g.id).ok()
    }

    fn local_coverage(&self, group: &Group) -> CapabilityVector {
        compute_group_coverage(group, &self.players, &self.builds, &self.model)
    }

    fn refresh_local(&mut self, idx: usize) {
        let coverage = self.local_coverage(&self.groups[idx]);
        let group = &mut self.groups[idx];
        group.coverage = coverage;
        group.coverage_source = CoverageSource::Local;
    }

    /// Verifies that `result` partitions exactly the current player set.
    fn check_assignment(&self, result: &OptimizeResult) -> Result<(), AssignmentError> {
        let mut groups = HashSet::with_capacity(result.groups.len());
        let mut assigned = HashSet::with_capacity(self.players.len());

        for group in &result.groups {
            if !groups.insert(group.group_id) {
                return Err(AssignmentError::DuplicateGroup {
                    group_id: group.group_id,
                });
            }
            if group.players.len() > GROUP_CAPACITY {
                return Err(AssignmentError::GroupOverCapacity {
                    group_id: group.group_id,
                    size: group.players.len(),
                });
            }
            if group.builds.len() != group.players.len() {
                return Err(AssignmentError::BuildCountMismatch {
                    group_id: group.group_id,
                    players: group.players.len(),
                    builds: group.builds.len(),
                });
            }
            for &player_id in &group.players {
                if !self.players.contains_key(&player_id) {
                    return Err(AssignmentError::UnknownPlayer { player_id });
                }
                if !assigned.insert(player_id) {
                    return Err(AssignmentError::DuplicatePlayer { player_id });
                }
            }
        }

        let missing = self.players.len() - assigned.len();
        if missing > 0 {
            return Err(AssignmentError::MissingPlayers { missing });
        }
        Ok(())
    }

    /// Replaces membership, builds and coverage with a checked assignment.
    fn adopt_assignment(&mut self, result: &OptimizeResult) {
        for group in &result.groups {
            for (&player_id, &build_id) in group.players.iter().zip(&group.builds) {
                if let Some(player) = self.players.get_mut(&player_id) {
                    *player = Player {
                        id: player_id,
                        name: core::mem::take(&mut player.name),
                        build_id,
                        group_id: group.group_id,
                    };
                }
            }
        }

        let mut groups: Vec<Group> = result
            .groups
            .iter()
            .enumerate()
            .map(|(i, assigned)| {
                let mut group = Group::new(assigned.group_id, assigned.players.clone());
                match result.coverage_by_group.get(i) {
                    Some(coverage) => {
                        group.coverage = *coverage;
                        group.coverage_source = CoverageSource::Server;
                    }
                    None => group.coverage = self.local_coverage(&group),
                }
                group
            })
            .collect();
        groups.sort_by_key(|g| g.id);
        self.groups = groups;
    }
}
