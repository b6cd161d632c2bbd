/*! Entry-hop HTTP transport.

One envelope, one POST, one fresh TLS connection: paths rotate per
request, so nothing is pooled. The response is handed back verbatim; any
onion-level reply handling happens above this layer.
*/

use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::onion::OnionEnvelope;

use lsrpc_packet::service_node::PathHop;

use thiserror::Error;

/// Path every onion request is POSTed to on the entry hop.
pub const ONION_REQUEST_PATH: &str = "/onion_req/v2";

/// Verbatim HTTP response from the entry hop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OnionResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Error that can happen when sending an envelope to the entry hop.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TransportError {
    /// Could not connect to the entry hop.
    #[error("Could not connect to the entry hop: {0}")]
    Connect(String),
    /// TLS handshake with the entry hop failed.
    #[error("TLS handshake with the entry hop failed: {0}")]
    Tls(String),
    /// Entry hop answered with a non-success status.
    #[error("Entry hop answered with HTTP status {0}")]
    HttpStatus(u16),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// Request was cancelled.
    #[error("Request was cancelled")]
    Cancelled,
    /// Reading the response failed.
    #[error("Reading the response failed: {0}")]
    Io(String),
}

/// URL an envelope is POSTed to.
pub fn endpoint(entry: &PathHop) -> String {
    format!("https://{}:{}{}", entry.ip, entry.port, ONION_REQUEST_PATH)
}

/// POSTs built envelopes to their entry hop.
pub struct Transport {
    lax: reqwest::Client,
    strict: reqwest::Client,
    config: ClientConfig,
}

impl Transport {
    /// Create a transport honoring the timeout and TLS options in
    /// `config`.
    pub fn new(config: &ClientConfig) -> Transport {
        let lax = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()
            .expect("failed to build HTTP client");
        let strict = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("failed to build HTTP client");
        Transport {
            lax,
            strict,
            config: config.clone(),
        }
    }

    /// Certificate policy is fixed when a client is built, so the
    /// per-host [`ClientConfig::tls_verify_for`] decision picks between
    /// a lax and a verifying client.
    fn client_for(&self, host: &str) -> &reqwest::Client {
        if self.config.tls_verify_for(host) {
            &self.strict
        } else {
            &self.lax
        }
    }

    /// Send an envelope to its entry hop and return the response
    /// verbatim.
    pub async fn send(&self, envelope: &OnionEnvelope) -> Result<OnionResponse, TransportError> {
        let url = endpoint(&envelope.entry);
        debug!("posting {} byte envelope to '{}'", envelope.bytes.len(), url);

        let response = self
            .client_for(&envelope.entry.ip)
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(envelope.bytes.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            warn!("entry hop '{}' answered {}", url, status);
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(OnionResponse {
            status_code: status.as_u16(),
            headers,
            body,
        })
    }

    /// Like [`send`](Self::send), aborted with
    /// [`TransportError::Cancelled`] as soon as the token fires.
    pub async fn send_cancellable(
        &self,
        envelope: &OnionEnvelope,
        cancel: &CancellationToken,
    ) -> Result<OnionResponse, TransportError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.send(envelope) => result,
        }
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout;
    }
    let chain = error_chain(&error);
    if ["certificate", "handshake", "tls", "ssl"].iter().any(|needle| chain.contains(needle)) {
        return TransportError::Tls(chain);
    }
    if error.is_connect() {
        return TransportError::Connect(chain);
    }
    TransportError::Io(chain)
}

/// Flatten an error and its sources into one lowercase line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text.to_lowercase()
}
