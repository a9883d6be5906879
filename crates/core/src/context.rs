//! One-time wiring of the client components.

use std::sync::Arc;

use tracing::info;

use crate::{
    auth::Authenticator,
    client::Channels,
    config::AppConfig,
    credentials::{CredentialStore, FileCredentialStorage},
    error::Result,
    state::SyncEngine,
    telemetry::{ErrorReporter, TracingReporter},
};

/// Owned handles to every long-lived component, built once at startup.
#[derive(Clone)]
pub struct AppContext {
    /// Configuration the context was built from.
    pub config: AppConfig,
    /// Session credential shared by every component.
    pub credentials: Arc<CredentialStore>,
    /// Typed clients for both services.
    pub channels: Channels,
    /// Login and registration.
    pub auth: Authenticator,
    /// Drives the shared application state.
    pub engine: SyncEngine,
}

impl AppContext {
    /// Restore the saved credential and build both channels over HTTP.
    pub fn connect(config: AppConfig) -> Result<Self> {
        let credentials = Arc::new(CredentialStore::restore(FileCredentialStorage::new(
            &config.data_dir,
        )));
        let channels = Channels::connect(&config, credentials.clone())?;
        info!(api = %config.api_base_url, "client channels ready");
        Ok(Self::assemble(
            config,
            credentials,
            channels,
            Arc::new(TracingReporter),
        ))
    }

    /// Wire already-built channels together with the state engine.
    pub fn assemble(
        config: AppConfig,
        credentials: Arc<CredentialStore>,
        channels: Channels,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let auth = Authenticator::new(channels.public.clone(), credentials.clone());
        let engine = SyncEngine::new(
            Arc::new(channels.private.clone()),
            credentials.clone(),
            reporter,
        );

        Self {
            config,
            credentials,
            channels,
            auth,
            engine,
        }
    }

    /// Clear all session state, including the stored credential.
    pub fn logout(&self) -> Result<()> {
        self.engine.reset()
    }
}
