use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// The closed set of boons and utilities a build can contribute to a group.
///
/// Serialized as the lowercase capability name (`"quickness"`, `"strip"`,
/// ...). The declaration order is the canonical order used when iterating a
/// [`CapabilityVector`] and when reporting warnings.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Quickness,
    Alacrity,
    Stability,
    Resistance,
    Protection,
    Might,
    Fury,
    Regeneration,
    Vigor,
    Aegis,
    Superspeed,
    Barrier,
    Cleanse,
    Strip,
    Healing,
}

impl Capability {
    /// Number of capabilities tracked by a [`CapabilityVector`].
    pub const COUNT: usize = 15;

    /// Every capability, in canonical order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Quickness,
        Self::Alacrity,
        Self::Stability,
        Self::Resistance,
        Self::Protection,
        Self::Might,
        Self::Fury,
        Self::Regeneration,
        Self::Vigor,
        Self::Aegis,
        Self::Superspeed,
        Self::Barrier,
        Self::Cleanse,
        Self::Strip,
        Self::Healing,
    ];

    /// Position of this capability inside a [`CapabilityVector`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The lowercase wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Quickness => "quickness",
            Self::Alacrity => "alacrity",
            Self::Stability => "stability",
            Self::Resistance => "resistance",
            Self::Protection => "protection",
            Self::Might => "might",
            Self::Fury => "fury",
            Self::Regeneration => "regeneration",
            Self::Vigor => "vigor",
            Self::Aegis => "aegis",
            Self::Superspeed => "superspeed",
            Self::Barrier => "barrier",
            Self::Cleanse => "cleanse",
            Self::Strip => "strip",
            Self::Healing => "healing",
        }
    }

    /// Looks up a capability by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contribution attributed to a build missing from the capability model.
pub const DEFAULT_CONTRIBUTION: f64 = 0.2;

/// Clamps `value` into `[0, 1]`. `NaN` maps to `0`.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Per-capability uptime estimate, every entry in `[0, 1]`.
///
/// Vectors combine with a *saturating sum*: `combined[k] = min(1, a[k] +
/// b[k])`. More sources of a boon raise its uptime, but uptime never exceeds
/// 100%. The sum is commutative and associative, so the order in which group
/// members are folded in does not matter.
///
/// On the wire a vector is a JSON object keyed by capability name. Unknown
/// names are ignored and missing names read as `0`.
///
/// ```
/// use warband::{Capability, CapabilityVector};
///
/// let a = CapabilityVector::from_pairs([(Capability::Quickness, 0.7)]);
/// let b = CapabilityVector::from_pairs([(Capability::Quickness, 0.6), (Capability::Might, 0.2)]);
/// let sum = a + b;
///
/// assert_eq!(sum.get(Capability::Quickness), 1.0);
/// assert_eq!(sum.get(Capability::Might), 0.2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapabilityVector([f64; Capability::COUNT]);

impl CapabilityVector {
    /// The empty contribution.
    pub const ZERO: Self = Self([0.0; Capability::COUNT]);

    /// Fallback for builds the capability model has no entry for.
    pub const DEFAULT: Self = Self([DEFAULT_CONTRIBUTION; Capability::COUNT]);

    /// Builds a vector from `(capability, value)` pairs. Values are clamped
    /// into `[0, 1]`; unmentioned capabilities are `0`. A capability listed
    /// twice keeps the last value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Capability, f64)>) -> Self {
        let mut vector = Self::ZERO;
        for (capability, value) in pairs {
            vector.set(capability, value);
        }
        vector
    }

    #[must_use]
    pub const fn get(&self, capability: Capability) -> f64 {
        self.0[capability.index()]
    }

    /// Overwrites one entry, clamping into `[0, 1]`.
    pub fn set(&mut self, capability: Capability, value: f64) {
        self.0[capability.index()] = clamp_unit(value);
    }

    /// Saturating sum of two vectors.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        let mut out = self;
        for (slot, value) in out.0.iter_mut().zip(other.0) {
            *slot = (*slot + value).min(1.0);
        }
        out
    }

    /// Iterates `(capability, value)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Capability, f64)> + '_ {
        Capability::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Default for CapabilityVector {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for CapabilityVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl AddAssign for CapabilityVector {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl Sum for CapabilityVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl Serialize for CapabilityVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Capability::COUNT))?;
        for (capability, value) in self.iter() {
            map.serialize_entry(capability.name(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CapabilityVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
        Ok(Self::from_pairs(raw.into_iter().filter_map(|(name, value)| {
            Some((Capability::from_name(&name)?, value?))
        })))
    }
}
