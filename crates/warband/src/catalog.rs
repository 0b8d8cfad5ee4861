use crate::{Build, BuildId, CatalogError, Mode};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Read-only set of builds available for the session, ordered by id.
///
/// Loaded once and shared by `Arc` between the store, the job client and any
/// reader. Players refer to builds by [`BuildId`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildCatalog {
    builds: BTreeMap<BuildId, Build>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<Build>),
    Wrapped { builds: Vec<Build> },
}

impl BuildCatalog {
    /// Builds a catalog from a list of builds.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateBuild`] if two builds share an id.
    pub fn new(builds: impl IntoIterator<Item = Build>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for build in builds {
            let id = build.id;
            if map.insert(id, build).is_some() {
                return Err(CatalogError::DuplicateBuild { id });
            }
        }
        Ok(Self { builds: map })
    }

    /// Parses a catalog from JSON: either a bare array of builds or an object
    /// with a `builds` array.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] on malformed JSON and
    /// [`CatalogError::DuplicateBuild`] on repeated ids.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let builds = match serde_json::from_str::<CatalogDocument>(json)? {
            CatalogDocument::List(builds) | CatalogDocument::Wrapped { builds } => builds,
        };
        Self::new(builds)
    }

    #[must_use]
    pub fn get(&self, id: BuildId) -> Option<&Build> {
        self.builds.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: BuildId) -> bool {
        self.builds.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.builds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    /// Builds in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Build> {
        self.builds.values()
    }

    /// Build ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = BuildId> + '_ {
        self.builds.keys().copied()
    }

    /// Builds tuned for `mode`, in id order.
    pub fn in_mode(&self, mode: Mode) -> impl Iterator<Item = &Build> {
        self.builds.values().filter(move |b| b.mode == mode)
    }
}
