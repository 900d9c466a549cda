//! [`AuthBackend`] over HTTP using `reqwest`.

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tradedesk_protocol::{AuthResponse, Credentials, Registration, UserProfile};

use crate::{AuthBackend, AuthHeader, ClientConfig, FailedCall, TransportError, with_retry};

const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";
const PROFILE_PATH: &str = "auth/profile";

/// Talks to the Tradedesk REST API.
///
/// Every request carries whatever [`AuthHeader`] holds at send time.
/// Only the profile fetch is retried; login and registration are not
/// idempotent.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
    header: AuthHeader,
}

impl HttpBackend {
    /// Builds a client for `config`, reading credentials from `header`.
    ///
    /// # Errors
    /// - [`TransportError::InvalidConfig`] for a malformed base URL
    /// - [`TransportError::Client`] if the TLS backend can't initialize
    pub fn new(config: ClientConfig, header: AuthHeader) -> Result<Self, TransportError> {
        let config = config.validated()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::Client)?;

        tracing::debug!(base_url = %config.base_url, "http backend ready");

        Ok(Self {
            client,
            config,
            header,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FailedCall> {
        let request = match self.header.value() {
            Some(bearer) => request.header(AUTHORIZATION, bearer),
            None => request,
        };

        let response = request.send().await.map_err(failed_from_reqwest)?;
        let status = response.status();

        if !status.is_success() {
            // The body is only used for its `message`/`error` field, so
            // anything that isn't JSON is dropped.
            let body = response
                .text()
                .await
                .ok()
                .and_then(|text| serde_json::from_str::<Value>(&text).ok());
            tracing::debug!(status = status.as_u16(), "backend returned error status");
            return Err(FailedCall::status(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FailedCall::malformed(status.as_u16(), e.to_string()))
    }

    async fn authenticate<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthResponse, FailedCall> {
        let url = self.config.url(path);
        let response: AuthResponse = self.send(self.client.post(url).json(body)).await?;
        response
            .validate()
            .map_err(|e| FailedCall::malformed(200, e.to_string()))?;
        Ok(response)
    }
}

impl AuthBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, FailedCall> {
        self.authenticate(LOGIN_PATH, credentials).await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, FailedCall> {
        self.authenticate(REGISTER_PATH, registration).await
    }

    async fn profile(&self) -> Result<UserProfile, FailedCall> {
        let url = self.config.url(PROFILE_PATH);
        with_retry(self.config.max_retries, || {
            self.send(self.client.get(url.as_str()))
        })
        .await
    }
}

fn failed_from_reqwest(error: reqwest::Error) -> FailedCall {
    if let Some(status) = error.status() {
        return FailedCall::status(status.as_u16(), None);
    }
    let code = if error.is_timeout() {
        "ETIMEDOUT"
    } else if error.is_connect() {
        "ECONNREFUSED"
    } else {
        "ERR_NETWORK"
    };
    tracing::debug!(code, error = %error, "backend unreachable");
    FailedCall::network(code, error.to_string())
}
