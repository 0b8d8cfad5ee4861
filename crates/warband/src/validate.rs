//! Read-only composition checks.
//!
//! The validator never mutates anything: it inspects a [`SquadSnapshot`] and
//! reports what a squad lead would want to fix.

use crate::{
    Capability, GROUP_CAPACITY, GroupId, MAX_SQUAD_SIZE, MIN_SQUAD_SIZE, SquadSnapshot, Targets,
};
use core::fmt;
use std::collections::BTreeMap;

const DEFAULT_THRESHOLDS: [(Capability, f64); 7] = [
    (Capability::Quickness, 0.9),
    (Capability::Alacrity, 0.9),
    (Capability::Stability, 0.6),
    (Capability::Resistance, 0.5),
    (Capability::Protection, 0.5),
    (Capability::Might, 0.8),
    (Capability::Fury, 0.8),
];

/// Minimum per-group coverage for the capabilities that are checked.
/// Capabilities without a threshold are never reported.
#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds(BTreeMap<Capability, f64>);

impl Thresholds {
    /// No thresholds at all.
    #[must_use]
    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    /// Thresholds taken from a job's uptime targets.
    #[must_use]
    pub fn from_targets(targets: &Targets) -> Self {
        targets.iter().collect()
    }

    #[must_use]
    pub fn with(mut self, capability: Capability, minimum: f64) -> Self {
        self.0.insert(capability, minimum);
        self
    }

    #[must_use]
    pub fn get(&self, capability: Capability) -> Option<f64> {
        self.0.get(&capability).copied()
    }

    /// Iterates in canonical capability order.
    pub fn iter(&self) -> impl Iterator<Item = (Capability, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        DEFAULT_THRESHOLDS.into_iter().collect()
    }
}

impl FromIterator<(Capability, f64)> for Thresholds {
    fn from_iter<I: IntoIterator<Item = (Capability, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One problem found in a squad composition.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    SquadSize {
        size: usize,
    },
    GroupOverCapacity {
        group_id: GroupId,
        size: usize,
    },
    EmptyGroup {
        group_id: GroupId,
    },
    BelowTarget {
        group_id: GroupId,
        capability: Capability,
        coverage: f64,
        target: f64,
    },
}

impl Warning {
    /// The group the warning concerns, if any.
    #[must_use]
    pub const fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::SquadSize { .. } => None,
            Self::GroupOverCapacity { group_id, .. }
            | Self::EmptyGroup { group_id }
            | Self::BelowTarget { group_id, .. } => Some(*group_id),
        }
    }
}

fn percent(value: f64) -> f64 {
    (value * 100.0).round()
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SquadSize { size } => write!(
                f,
                "squad of {size} players is outside {MIN_SQUAD_SIZE}..={MAX_SQUAD_SIZE}"
            ),
            Self::GroupOverCapacity { group_id, size } => write!(
                f,
                "group {group_id}: {size} players exceed the limit of {GROUP_CAPACITY}"
            ),
            Self::EmptyGroup { group_id } => write!(f, "group {group_id}: no players"),
            Self::BelowTarget {
                group_id,
                capability,
                coverage,
                target,
            } => write!(
                f,
                "group {group_id}: {capability} coverage {}% below the {}% target",
                percent(*coverage),
                percent(*target)
            ),
        }
    }
}

/// Checks snapshots against a set of [`Thresholds`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintValidator {
    thresholds: Thresholds,
}

impl ConstraintValidator {
    #[must_use]
    pub const fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Lists every warning for `snapshot`.
    ///
    /// A squad-size warning comes first, then per-group warnings by group id.
    /// Within a group, capacity and emptiness come before coverage, and
    /// coverage warnings follow capability order. An empty group only
    /// reports [`Warning::EmptyGroup`].
    #[must_use]
    pub fn validate(&self, snapshot: &SquadSnapshot) -> Vec<Warning> {
        let mut warnings = Vec::new();

        let size = snapshot.players.len();
        if !(MIN_SQUAD_SIZE..=MAX_SQUAD_SIZE).contains(&size) {
            warnings.push(Warning::SquadSize { size });
        }

        let mut groups: Vec<_> = snapshot.groups.iter().collect();
        groups.sort_by_key(|g| g.id);

        for group in groups {
            if group.is_empty() {
                warnings.push(Warning::EmptyGroup { group_id: group.id });
                continue;
            }
            if group.len() > GROUP_CAPACITY {
                warnings.push(Warning::GroupOverCapacity {
                    group_id: group.id,
                    size: group.len(),
                });
            }
            for (capability, target) in self.thresholds.iter() {
                let coverage = group.coverage.get(capability);
                if coverage < target {
                    warnings.push(Warning::BelowTarget {
                        group_id: group.id,
                        capability,
                        coverage,
                        target,
                    });
                }
            }
        }
        warnings
    }
}
