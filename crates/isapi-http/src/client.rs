//! reqwest-backed transport for ISAPI endpoints.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info};

use crate::digest::DigestChallenge;

/// Transport constants.
pub mod consts {
    use std::time::Duration;

    /// Timeout applied to every request issued by a [`super::DigestClient`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Nonce count sent with `qop=auth`; each challenge is answered exactly once.
    pub const NONCE_COUNT: &str = "00000001";
}

/// Errors produced while talking to a device.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("digest auth: {0}")]
    Auth(String),
}

/// Username/password pair used to answer Digest challenges.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal interface required to fetch a document from a device.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Per-client settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// Skip TLS certificate validation for this client only.
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: consts::DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
        }
    }
}

/// HTTP client answering Digest challenges with the configured credentials.
#[derive(Debug, Clone)]
pub struct DigestClient {
    client: reqwest::Client,
    credentials: Credentials,
}

impl DigestClient {
    pub fn new(credentials: Credentials, options: ClientOptions) -> Result<Self, TransportError> {
        if options.accept_invalid_certs {
            debug!("TLS certificate validation disabled for this client");
        }
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    async fn send(
        &self,
        url: Url,
        authorization: Option<String>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self.client.get(url);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl HttpTransport for DigestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let url = Url::parse(url).map_err(|err| TransportError::Url(format!("{url}: {err}")))?;
        info!(%url, "GET");
        let response = self.send(url.clone(), None).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_response(response).await;
        }

        let Some(header) = digest_header(response.headers()) else {
            debug!("401 without a Digest challenge");
            return read_response(response).await;
        };
        let answer = DigestChallenge::parse(&header).and_then(|challenge| {
            challenge.authorization(&self.credentials, "GET", &request_uri(&url))
        });
        let authorization = match answer {
            Ok(authorization) => authorization,
            Err(err) => {
                debug!(error = %err, "cannot answer Digest challenge");
                return read_response(response).await;
            }
        };
        let response = self.send(url, Some(authorization)).await?;
        read_response(response).await
    }
}

fn digest_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| {
            value
                .trim_start()
                .get(..6)
                .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
        })
        .map(str::to_string)
}

fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

async fn read_response(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();
    debug!(status, bytes = body.len(), "response received");
    Ok(HttpResponse { status, body })
}
