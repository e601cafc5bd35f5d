//! Progression core: effort ledger, upgrade gating, base grid and the
//! per-player coordinator that ties them together.
//!
//! The core is synchronous and transport-agnostic. It never reads the wall
//! clock or draws random numbers; callers pass `now` in.

pub mod channel;
pub mod clock;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod exercise;
pub mod gating;
pub mod grid;
pub mod ledger;
pub mod planner;
pub mod rng;
pub mod rules;
pub mod scenario;
pub mod snapshot;
pub mod store;
pub mod types;

pub use channel::{Channel, ChannelTotals};
pub use command::{PendingToken, Request, RequestKind, Response, ResultingState};
pub use config::CoreConfig;
pub use coordinator::ProgressionCoordinator;
pub use error::{CoreError, CoreResult, PlacementError};
pub use grid::{GridStore, StructureInstance, StructureState};
pub use ledger::ChannelLedger;
pub use planner::{PlacementPlanner, PlacementTarget};
pub use rules::StructureType;
pub use store::{PlayerStore, SqliteStore};
pub use types::{Cell, Footprint};
