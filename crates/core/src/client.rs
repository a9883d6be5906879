//! Typed clients for the public and private services.

use std::{sync::Arc, time::Duration};

use crate::{
    auth::AuthInterceptor,
    channel::{Channel, Streaming},
    config::AppConfig,
    credentials::CredentialStore,
    error::Result,
    proto::*,
    transport::{HttpTransport, Transport},
};

/// Unauthenticated calls: login, registration and public hiscores.
#[derive(Clone)]
pub struct PublicClient {
    channel: Channel,
}

impl PublicClient {
    /// Client over `channel`.
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        self.channel.unary("Login", &request).await
    }

    /// Create an account and receive a session token.
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse> {
        self.channel.unary("Register", &request).await
    }

    /// Public leaderboard.
    pub async fn get_hiscores(&self, request: GetHiscoresRequest) -> Result<GetHiscoresResponse> {
        self.channel.unary("GetHiscores", &request).await
    }
}

/// Calls that require a session credential.
///
/// Every call passes through [`AuthInterceptor`] and fails with
/// [`crate::Error::Unauthenticated`] before reaching the network when no
/// credential is present.
#[derive(Clone)]
pub struct PrivateClient {
    channel: Channel,
}

impl PrivateClient {
    /// Client over `channel`.
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Full item catalog.
    pub async fn get_item_descriptors(&self) -> Result<GetItemDescriptorsResponse> {
        self.channel
            .unary("GetItemDescriptors", &GetItemDescriptorsRequest {})
            .await
    }

    /// Mine locations with per-player availability.
    pub async fn get_mine_locations(&self) -> Result<GetMineLocationsResponse> {
        self.channel
            .unary("GetMineLocations", &GetMineLocationsRequest {})
            .await
    }

    /// Gamble locations with per-player availability.
    pub async fn get_gamble_locations(&self) -> Result<GetGambleLocationsResponse> {
        self.channel
            .unary("GetGambleLocations", &GetGambleLocationsRequest {})
            .await
    }

    /// The logged-in player's account.
    pub async fn get_account(&self) -> Result<GetAccountResponse> {
        self.channel.unary("GetAccount", &GetAccountRequest {}).await
    }

    /// One sorted page of the inventory.
    pub async fn get_inventory(
        &self,
        request: GetInventoryRequest,
    ) -> Result<GetInventoryResponse> {
        self.channel.unary("GetInventory", &request).await
    }

    /// Current base upgrades.
    pub async fn get_base(&self) -> Result<GetBaseResponse> {
        self.channel.unary("GetBase", &GetBaseRequest {}).await
    }

    /// Open the mining progress stream.
    pub async fn start_mining(
        &self,
        request: StartMiningRequest,
    ) -> Result<Streaming<StartMiningResponse>> {
        self.channel.server_streaming("StartMining", &request).await
    }

    /// End the current mining session.
    pub async fn stop_mining(&self) -> Result<StopMiningResponse> {
        self.channel.unary("StopMining", &StopMiningRequest {}).await
    }

    /// Buy one level of an upgrade; returns the new upgrade levels.
    pub async fn upgrade_base(&self, request: UpgradeBaseRequest) -> Result<UpgradeBaseResponse> {
        self.channel.unary("UpgradeBase", &request).await
    }
}

/// Both channels, built once at startup and handed to whoever needs them.
#[derive(Clone)]
pub struct Channels {
    /// Unauthenticated service.
    pub public: PublicClient,
    /// Authenticated service.
    pub private: PrivateClient,
}

impl Channels {
    /// Build both clients over HTTP using the configured endpoint.
    pub fn connect(config: &AppConfig, credentials: Arc<CredentialStore>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.api_base_url.clone())?);
        Ok(Self::with_transport(
            transport,
            credentials,
            Some(config.request_timeout()),
        ))
    }

    /// Build both clients over an arbitrary transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialStore>,
        timeout: Option<Duration>,
    ) -> Self {
        let mut public = Channel::new(PUBLIC_SERVICE, transport.clone());
        let mut private = Channel::new(PRIVATE_SERVICE, transport)
            .with_interceptor(AuthInterceptor::new(credentials));
        if let Some(timeout) = timeout {
            public = public.with_timeout(timeout);
            private = private.with_timeout(timeout);
        }

        Self {
            public: PublicClient::new(public),
            private: PrivateClient::new(private),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        transport::{codec::encode_message, RpcRequest, RpcResponse},
    };
    use async_trait::async_trait;
    use futures::{stream, StreamExt};
    use parking_lot::Mutex;
    use reqwest::header::HeaderMap;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<RpcRequest>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn call(&self, request: RpcRequest) -> Result<RpcResponse> {
            self.requests.lock().push(request);
            let body = encode_message(&GetHiscoresResponse::default());
            Ok(RpcResponse {
                http_status: 200,
                metadata: HeaderMap::new(),
                body: stream::iter(vec![Ok(body)]).boxed(),
            })
        }
    }

    #[tokio::test]
    async fn private_call_without_credential_never_hits_network() {
        let transport = Arc::new(Recorder::default());
        let channels = Channels::with_transport(
            transport.clone(),
            Arc::new(CredentialStore::in_memory()),
            None,
        );

        let err = channels.private.get_base().await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        let err = channels
            .private
            .start_mining(StartMiningRequest {
                location_name: "starter".to_string(),
            })
            .await
            .err();
        assert!(matches!(err, Some(Error::Unauthenticated)));
        assert!(transport.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn public_call_carries_no_credential() -> Result<()> {
        let transport = Arc::new(Recorder::default());
        let credentials = Arc::new(CredentialStore::in_memory());
        credentials.set("secret")?;
        let channels = Channels::with_transport(transport.clone(), credentials, None);

        channels.public.get_hiscores(GetHiscoresRequest {}).await?;

        let requests = transport.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/mine.MinePublicService/GetHiscores");
        assert!(requests[0].metadata.get("authorization").is_none());
        Ok(())
    }
}
