//! Boon coverage computation.
//!
//! Coverage is never maintained incrementally. Whenever membership changes the
//! affected groups are recomputed from scratch; with at most five players per
//! group this is cheap and rules out drift between the stored value and the
//! members actually present.

use crate::{BuildCatalog, BuildId, CapabilityModel, CapabilityVector, Group, Player, PlayerId};
use std::collections::BTreeMap;

/// Saturating sum of the capability vectors of `group`'s members.
///
/// Each member's build is looked up in `builds` and resolved through `model`.
/// A build id missing from the catalog contributes
/// [`CapabilityVector::DEFAULT`], the same as a build the model does not know.
/// Members missing from `players` contribute nothing.
#[must_use]
pub fn compute_group_coverage(
    group: &Group,
    players: &BTreeMap<PlayerId, Player>,
    builds: &BuildCatalog,
    model: &CapabilityModel,
) -> CapabilityVector {
    coverage_of_builds(
        group
            .player_ids
            .iter()
            .filter_map(|id| players.get(id))
            .map(|p| p.build_id),
        builds,
        model,
    )
}

/// Saturating sum over an arbitrary set of build ids.
#[must_use]
pub fn coverage_of_builds(
    build_ids: impl IntoIterator<Item = BuildId>,
    builds: &BuildCatalog,
    model: &CapabilityModel,
) -> CapabilityVector {
    build_ids
        .into_iter()
        .map(|id| {
            builds
                .get(id)
                .map_or(CapabilityVector::DEFAULT, |b| model.capabilities_of(b))
        })
        .sum()
}
