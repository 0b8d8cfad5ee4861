//! # warband-client
//!
//! Network side of the squad engine: submits optimization jobs to a remote
//! optimizer over HTTP and follows their progress on a server-push
//! (`text/event-stream`) channel.
//!
//! - [`JobClient`] posts an [`OptimizeRequest`](warband::OptimizeRequest) to
//!   `POST /optimize` and opens `GET /optimize/stream/{job_id}`.
//! - [`Subscription`] is the open stream: a [`futures::Stream`] of
//!   [`Frame`](warband::Frame)s with an idempotent close. Transport failures
//!   arrive in-band as one terminal `error` frame.
//! - [`SquadSession`] owns a [`SquadStore`](warband::SquadStore) and applies
//!   every received frame to it, while local moves keep working
//!   synchronously.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use warband::{BuildCatalog, CapabilityModel, JobOptions, SquadStore};
//! use warband_client::{ClientConfig, JobClient, SquadSession};
//!
//! # async fn run(catalog: Arc<BuildCatalog>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = JobClient::new(ClientConfig::new("http://127.0.0.1:8000"))?;
//! let store = SquadStore::new(Arc::new(CapabilityModel::standard()), Arc::clone(&catalog));
//! let mut session = SquadSession::new(client, store);
//!
//! session.initialize_squad(15, catalog)?;
//! let mut updates = session.updates();
//! session.start(&JobOptions::default()).await?;
//! updates.wait_for(|job| job.status.is_terminal()).await?;
//!
//! println!("{:?}", session.snapshot().job);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit `tracing` events and spans for submission and stream
//!   lifecycle.

mod client;
mod config;
mod error;
mod pump;
mod session;
mod sse;
mod subscription;

pub use crate::client::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::session::*;
pub use crate::sse::*;
pub use crate::subscription::*;
