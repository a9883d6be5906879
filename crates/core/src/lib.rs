#![warn(clippy::all, missing_docs)]

//! Session, transport and state synchronisation for the Mine Idler client.
//!
//! This crate owns the session credential, the two RPC channels to the game
//! backend, and the observable application state fed by them. Frontends read
//! the state and readiness flag; they never talk to the network directly.

pub mod auth;
pub mod channel;
pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod proto;
pub mod state;
pub mod telemetry;
pub mod transport;

pub use auth::{AuthInterceptor, Authenticator};
pub use client::{Channels, PrivateClient, PublicClient};
pub use config::AppConfig;
pub use context::AppContext;
pub use credentials::{CredentialStorage, CredentialStore, FileCredentialStorage};
pub use error::{Code, Error, Result};
pub use state::{
    GlobalAppState, InitOutcome, LoadStatus, Location, LocationLoads, SyncEngine, SyncPhase,
};
pub use telemetry::{ErrorReporter, TracingReporter};
