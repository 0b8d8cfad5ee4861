//! # warband
//!
//! Reconciliation engine for World-vs-World squad compositions.
//!
//! The crate owns the canonical in-memory model of a squad (players, their
//! builds, and the subgroups they are assigned to) and keeps it consistent
//! while two independent writers touch it:
//!
//! - result frames pushed by a remote optimizer ([`SquadStore::apply_frame`]),
//!   which are authoritative for group *membership*, and
//! - optimistic local edits ([`SquadStore::move_player`]), which are
//!   authoritative for the *coverage* of the groups they touch until the next
//!   frame arrives.
//!
//! Per-group boon coverage is derived from a declarative [`CapabilityModel`]
//! and combined with a saturating sum (see [`CapabilityVector`]).
//!
//! The crate performs no IO and spawns nothing. Networking lives in
//! `warband-client`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use warband::{
//!     Build, BuildCatalog, BuildId, CapabilityModel, GroupId, Mode, MoveOutcome, PlayerId,
//!     SquadStore,
//! };
//!
//! let catalog = Arc::new(
//!     BuildCatalog::new([
//!         Build::new(BuildId(1), "Guardian", "Firebrand", Mode::Wvw),
//!         Build::new(BuildId(2), "Engineer", "Scrapper", Mode::Wvw),
//!     ])
//!     .unwrap(),
//! );
//! let mut store = SquadStore::new(Arc::new(CapabilityModel::standard()), Arc::clone(&catalog));
//! store.initialize_squad(12, catalog).unwrap();
//!
//! assert_eq!(store.groups().len(), 3);
//! assert_eq!(store.move_player(PlayerId(11), GroupId(1)), MoveOutcome::GroupFull);
//! ```

mod capability;
mod catalog;
mod coverage;
mod error;
mod frame;
mod model;
mod request;
mod store;
mod validate;

pub use crate::capability::*;
pub use crate::catalog::*;
pub use crate::coverage::*;
pub use crate::error::*;
pub use crate::frame::*;
pub use crate::model::*;
pub use crate::request::*;
pub use crate::store::*;
pub use crate::validate::*;
