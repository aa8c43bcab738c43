#![cfg_attr(docsrs, feature(doc_cfg))]
//! High level ISAPI facade: query a recorder's `deviceInfo` endpoint, turn the
//! XML into a field map, and render or persist the outcome.
//!
//! ```rust,no_run
//! use isapi::{format_device_info, query_device, Credentials, QueryOptions, QueryResult};
//!
//! # async fn run() {
//! let creds = Credentials::new("admin", "password");
//! match query_device("192.168.1.100", creds, &QueryOptions::default()).await {
//!     QueryResult::Success { fields, .. } => println!("{}", format_device_info(&fields)),
//!     QueryResult::Failure { message, .. } => eprintln!("{message}"),
//! }
//! # }
//! ```

pub use isapi_http as http;
pub use isapi_xml as xml;

pub mod report;

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::http::{ClientOptions, DigestClient, HttpTransport};
use crate::xml::DeviceInfoMap;

pub use crate::http::Credentials;
pub use crate::report::format_device_info;

/// Path of the device identity resource.
pub const DEVICE_INFO_PATH: &str = "/ISAPI/System/deviceInfo";
/// File written by [`save_result`] when no other path is given.
pub const DEFAULT_RESULT_FILE: &str = "device_info_result.json";
/// Placeholder used when a non-200 response carries no body.
pub const NO_DETAILS: &str = "no details";

/// Error type produced by the facade's I/O helpers.
#[derive(Debug, Error)]
pub enum IsapiError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of a single device query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum QueryResult {
    #[serde(rename = "success")]
    Success {
        #[serde(rename = "device_info")]
        fields: DeviceInfoMap,
        #[serde(rename = "raw_response")]
        raw_body: String,
    },
    #[serde(rename = "error")]
    Failure {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl QueryResult {
    fn failure(message: impl Into<String>, details: Option<String>) -> Self {
        QueryResult::Failure {
            message: message.into(),
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        })
    }
}

/// Connection settings for [`query_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub port: u16,
    pub scheme: Scheme,
    pub timeout: Duration,
    /// Accept self-signed or otherwise invalid certificates for this query only.
    pub accept_invalid_certs: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        let client = ClientOptions::default();
        Self {
            port: 80,
            scheme: Scheme::Http,
            timeout: client.timeout,
            accept_invalid_certs: client.accept_invalid_certs,
        }
    }
}

impl QueryOptions {
    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.timeout,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Build the `deviceInfo` URL for `host`. IPv6 literals are bracketed.
pub fn device_info_url(host: &str, options: &QueryOptions) -> String {
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    format!(
        "{}://{host}:{}{DEVICE_INFO_PATH}",
        options.scheme, options.port
    )
}

/// Query `host` with Digest credentials. Every failure is folded into [`QueryResult::Failure`].
pub async fn query_device(
    host: &str,
    credentials: Credentials,
    options: &QueryOptions,
) -> QueryResult {
    let url = device_info_url(host, options);
    let client = match DigestClient::new(credentials, options.client_options()) {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "failed to build HTTP client");
            return QueryResult::failure(format!("connection error: {err}"), None);
        }
    };
    query_device_with(&client, &url).await
}

/// Fetch `url` through `transport` and extract the device fields.
pub async fn query_device_with<T>(transport: &T, url: &str) -> QueryResult
where
    T: HttpTransport + ?Sized,
{
    info!(%url, "querying device info");
    let response = match transport.get(url).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "device request failed");
            return QueryResult::failure(format!("connection error: {err}"), None);
        }
    };
    info!(status = response.status, "response code");

    let raw_body = response.text();
    if response.status != 200 {
        let details = if raw_body.is_empty() {
            NO_DETAILS.to_string()
        } else {
            raw_body
        };
        return QueryResult::failure(format!("HTTP error: {}", response.status), Some(details));
    }

    match xml::parse(&response.body) {
        Ok(root) => {
            let fields = xml::extract_device_info(&root);
            debug!(count = fields.len(), "device info extracted");
            QueryResult::Success { fields, raw_body }
        }
        Err(err) => {
            warn!(error = %err, "device returned malformed XML");
            QueryResult::failure(format!("XML parse error: {err}"), Some(raw_body))
        }
    }
}

/// Write `result` as indented JSON, replacing any existing file.
pub fn save_result(result: &QueryResult, path: &Path) -> Result<(), IsapiError> {
    let text = serde_json::to_string_pretty(result)?;
    let mut file = File::create(path)?;
    file.write_all(text.as_bytes())?;
    debug!(path = %path.display(), bytes = text.len(), "result saved");
    Ok(())
}
