//! Request body for `POST /optimize`.

use crate::{
    Build, BuildId, Capability, MAX_SQUAD_SIZE, MIN_SQUAD_SIZE, Mode, PlayerId, RequestError,
};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashSet};

const UPTIME_SUFFIX: &str = "_uptime";

/// Per-capability uptime targets, serialized as `{"<boon>_uptime": value}`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Targets(BTreeMap<Capability, f64>);

impl Targets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, capability: Capability, uptime: f64) -> Self {
        self.0.insert(capability, uptime);
        self
    }

    #[must_use]
    pub fn get(&self, capability: Capability) -> Option<f64> {
        self.0.get(&capability).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Capability, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Capability, f64)> for Targets {
    fn from_iter<I: IntoIterator<Item = (Capability, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Targets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (capability, value) in &self.0 {
            map.serialize_entry(&format!("{}{UPTIME_SUFFIX}", capability.name()), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Targets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| {
                let name = key.strip_suffix(UPTIME_SUFFIX).unwrap_or(&key);
                Some((Capability::from_name(name)?, value))
            })
            .collect())
    }
}

/// Relative importance of each capability to the optimizer's objective.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<Capability, f64>);

impl Weights {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, capability: Capability, weight: f64) -> Self {
        self.0.insert(capability, weight);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Capability, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }
}

impl FromIterator<(Capability, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (Capability, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Caller-tunable parts of a job request. The squad itself comes from the
/// store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobOptions {
    pub mode: Mode,
    pub time_limit_ms: Option<u64>,
    pub targets: Option<Targets>,
    pub weights: Option<Weights>,
}

/// A player entry of an [`OptimizeRequest`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RequestPlayer {
    pub id: PlayerId,
    pub name: String,
    pub eligible_build_ids: Vec<BuildId>,
}

/// Body of `POST /optimize`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptimizeRequest {
    pub players: Vec<RequestPlayer>,
    pub builds: Vec<Build>,
    pub mode: Mode,
    pub squad_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Targets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Weights>,
}

impl OptimizeRequest {
    /// Checks the request locally before it is sent.
    ///
    /// # Errors
    ///
    /// Returns the first [`RequestError`] found:
    /// - `squad_size` outside `1..=50`, or not matching the number of players
    /// - a player listed twice, with no eligible builds, or referencing a build
    ///   missing from `builds`
    /// - a mode other than `wvw`
    /// - a target outside `[0, 1]` or a negative/non-finite weight
    pub fn validate(&self) -> Result<(), RequestError> {
        if !(MIN_SQUAD_SIZE..=MAX_SQUAD_SIZE).contains(&self.squad_size) {
            return Err(RequestError::SquadSize {
                size: self.squad_size,
                min: MIN_SQUAD_SIZE,
                max: MAX_SQUAD_SIZE,
            });
        }
        if self.players.len() != self.squad_size {
            return Err(RequestError::PlayerCountMismatch {
                players: self.players.len(),
                squad_size: self.squad_size,
            });
        }
        if self.mode != Mode::Wvw {
            return Err(RequestError::UnsupportedMode { mode: self.mode });
        }

        let known: BTreeSet<BuildId> = self.builds.iter().map(|b| b.id).collect();
        let mut seen = HashSet::with_capacity(self.players.len());
        for player in &self.players {
            if !seen.insert(player.id) {
                return Err(RequestError::DuplicatePlayer {
                    player_id: player.id,
                });
            }
            if player.eligible_build_ids.is_empty() {
                return Err(RequestError::NoEligibleBuilds {
                    player_id: player.id,
                });
            }
            if let Some(&build_id) = player
                .eligible_build_ids
                .iter()
                .find(|id| !known.contains(id))
            {
                return Err(RequestError::UnknownBuild {
                    player_id: player.id,
                    build_id,
                });
            }
        }

        for (capability, value) in self.targets.iter().flat_map(Targets::iter) {
            if !(0.0..=1.0).contains(&value) {
                return Err(RequestError::InvalidTarget { capability, value });
            }
        }
        for (capability, value) in self.weights.iter().flat_map(Weights::iter) {
            if !value.is_finite() || value < 0.0 {
                return Err(RequestError::InvalidWeight { capability, value });
            }
        }
        Ok(())
    }
}
