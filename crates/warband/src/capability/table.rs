use super::{Capability, CapabilityVector};
use crate::Build;
use std::collections::HashMap;

use Capability::*;

/// Built-in World-vs-World contribution table.
///
/// Each row is `(profession, specialization, contributions)`. An empty
/// specialization denotes the core profession.
const STANDARD_WVW: &[(&str, &str, &[(Capability, f64)])] = &[
    (
        "guardian",
        "firebrand",
        &[
            (Quickness, 0.8),
            (Stability, 0.9),
            (Aegis, 0.7),
            (Resistance, 0.3),
            (Protection, 0.3),
            (Might, 0.3),
            (Cleanse, 0.5),
            (Healing, 0.4),
        ],
    ),
    (
        "guardian",
        "willbender",
        &[(Fury, 0.4), (Might, 0.3), (Stability, 0.3), (Aegis, 0.3), (Strip, 0.1)],
    ),
    ("guardian", "dragonhunter", &[(Aegis, 0.3), (Might, 0.2), (Strip, 0.1)]),
    ("guardian", "", &[(Stability, 0.4), (Aegis, 0.5), (Protection, 0.2)]),
    (
        "engineer",
        "scrapper",
        &[
            (Superspeed, 0.9),
            (Stability, 0.5),
            (Cleanse, 0.8),
            (Barrier, 0.3),
            (Healing, 0.4),
            (Vigor, 0.2),
            (Quickness, 0.4),
        ],
    ),
    (
        "engineer",
        "mechanist",
        &[(Alacrity, 0.8), (Might, 0.6), (Fury, 0.4), (Barrier, 0.3)],
    ),
    ("engineer", "holosmith", &[(Might, 0.3), (Fury, 0.3), (Strip, 0.2)]),
    (
        "mesmer",
        "chronomancer",
        &[(Quickness, 0.6), (Alacrity, 0.7), (Stability, 0.3), (Strip, 0.4)],
    ),
    ("mesmer", "virtuoso", &[(Might, 0.2), (Strip, 0.3)]),
    ("mesmer", "mirage", &[(Alacrity, 0.3), (Strip, 0.3)]),
    (
        "necromancer",
        "scourge",
        &[(Barrier, 0.8), (Strip, 0.9), (Cleanse, 0.3), (Might, 0.1)],
    ),
    (
        "necromancer",
        "reaper",
        &[(Strip, 0.6), (Stability, 0.2), (Might, 0.2)],
    ),
    ("necromancer", "harbinger", &[(Quickness, 0.5), (Strip, 0.4)]),
    (
        "elementalist",
        "tempest",
        &[
            (Healing, 0.8),
            (Cleanse, 0.7),
            (Regeneration, 0.6),
            (Protection, 0.5),
            (Alacrity, 0.5),
            (Might, 0.4),
            (Vigor, 0.3),
        ],
    ),
    (
        "elementalist",
        "catalyst",
        &[(Quickness, 0.5), (Might, 0.6), (Fury, 0.5), (Protection, 0.4)],
    ),
    ("elementalist", "weaver", &[(Might, 0.4), (Fury, 0.3), (Strip, 0.1)]),
    (
        "revenant",
        "herald",
        &[
            (Protection, 0.6),
            (Fury, 0.6),
            (Might, 0.5),
            (Quickness, 0.4),
            (Regeneration, 0.4),
            (Vigor, 0.3),
            (Stability, 0.2),
        ],
    ),
    (
        "revenant",
        "vindicator",
        &[(Protection, 0.3), (Resistance, 0.2), (Strip, 0.2)],
    ),
    ("revenant", "renegade", &[(Alacrity, 0.6), (Might, 0.5), (Fury, 0.3)]),
    (
        "ranger",
        "druid",
        &[
            (Healing, 0.8),
            (Regeneration, 0.7),
            (Cleanse, 0.5),
            (Might, 0.4),
            (Fury, 0.4),
            (Vigor, 0.3),
        ],
    ),
    ("ranger", "soulbeast", &[(Might, 0.5), (Fury, 0.5), (Quickness, 0.2)]),
    ("ranger", "untamed", &[(Might, 0.2), (Strip, 0.2)]),
    (
        "warrior",
        "spellbreaker",
        &[
            (Strip, 0.9),
            (Might, 0.4),
            (Resistance, 0.3),
            (Fury, 0.3),
            (Quickness, 0.2),
        ],
    ),
    (
        "warrior",
        "berserker",
        &[(Might, 0.5), (Resistance, 0.5), (Fury, 0.3), (Strip, 0.2)],
    ),
    ("warrior", "bladesworn", &[(Fury, 0.4), (Might, 0.3), (Alacrity, 0.2)]),
    ("thief", "specter", &[(Barrier, 0.5), (Alacrity, 0.5), (Strip, 0.2)]),
    ("thief", "deadeye", &[(Might, 0.2), (Fury, 0.2), (Strip, 0.2)]),
    ("thief", "daredevil", &[(Strip, 0.3), (Vigor, 0.3)]),
];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SpecKey {
    profession: String,
    specialization: String,
}

impl SpecKey {
    fn new(profession: &str, specialization: &str) -> Self {
        Self {
            profession: profession.trim().to_ascii_lowercase(),
            specialization: specialization.trim().to_ascii_lowercase(),
        }
    }
}

/// Static lookup from `(profession, specialization)` to the
/// [`CapabilityVector`] a build of that specialization contributes.
///
/// Keys are matched case-insensitively with surrounding whitespace ignored.
/// The model is injected into a [`SquadStore`](crate::SquadStore) so tests and
/// alternate rule sets can supply their own table.
#[derive(Clone, Debug, Default)]
pub struct CapabilityModel {
    entries: HashMap<SpecKey, CapabilityVector>,
}

impl CapabilityModel {
    /// A model with no entries; every build resolves to
    /// [`CapabilityVector::DEFAULT`].
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in World-vs-World table.
    #[must_use]
    pub fn standard() -> Self {
        STANDARD_WVW
            .iter()
            .fold(Self::empty(), |model, (profession, specialization, pairs)| {
                model.with_entry(
                    profession,
                    specialization,
                    CapabilityVector::from_pairs(pairs.iter().copied()),
                )
            })
    }

    /// Adds or replaces the entry for `(profession, specialization)`.
    #[must_use]
    pub fn with_entry(
        mut self,
        profession: &str,
        specialization: &str,
        vector: CapabilityVector,
    ) -> Self {
        self.entries
            .insert(SpecKey::new(profession, specialization), vector);
        self
    }

    /// Number of `(profession, specialization)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the capability vector for `build`.
    ///
    /// Total: a build without an entry yields [`CapabilityVector::DEFAULT`]
    /// rather than zero.
    #[must_use]
    pub fn capabilities_of(&self, build: &Build) -> CapabilityVector {
        self.entries
            .get(&SpecKey::new(&build.profession, &build.specialization))
            .copied()
            .unwrap_or(CapabilityVector::DEFAULT)
    }
}
