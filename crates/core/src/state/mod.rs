//! Shared application state and its synchronisation with the backend.

/// Engine driving the startup sequence and location merges.
pub mod engine;
/// State value types.
pub mod model;
/// Whole-value observable container.
pub mod observable;

pub use engine::{InitOutcome, StateSource, SyncEngine, SyncPhase};
pub use model::{GlobalAppState, LoadStatus, Location, LocationLoads};
pub use observable::{Observable, Subscription};
