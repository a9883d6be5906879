//! Credential attachment and the login/register flows.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::info;

use crate::{
    channel::Interceptor,
    client::PublicClient,
    credentials::CredentialStore,
    error::{Error, Result},
    proto::{LoginRequest, RegisterRequest},
    transport::RpcRequest,
};

/// Attaches the current session credential to every privileged call.
pub struct AuthInterceptor {
    credentials: Arc<CredentialStore>,
}

impl AuthInterceptor {
    /// Interceptor reading from `credentials` on every call.
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }
}

impl Interceptor for AuthInterceptor {
    fn intercept(&self, request: &mut RpcRequest) -> Result<()> {
        let token = self.credentials.get().ok_or(Error::Unauthenticated)?;
        let mut value = HeaderValue::from_str(&token).map_err(|_| {
            Error::Protocol("session token is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        request.metadata.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Login and registration, both ending in a stored session credential.
#[derive(Clone)]
pub struct Authenticator {
    public: PublicClient,
    credentials: Arc<CredentialStore>,
}

impl Authenticator {
    /// Flows over `public` that store the issued token in `credentials`.
    pub fn new(public: PublicClient, credentials: Arc<CredentialStore>) -> Self {
        Self {
            public,
            credentials,
        }
    }

    /// Whether a session credential is held.
    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_authenticated()
    }

    /// Log in and store the issued session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let response = self
            .public
            .login(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(username, "logged in");
        self.credentials.set(response.session_token)
    }

    /// Create an account; the new session token is stored as after a login.
    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        let response = self
            .public
            .register(RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(username, "registered new account");
        self.credentials.set(response.session_token)
    }
}
