//! HTTP client for the upstream recipe API.

use config::UpstreamConfig;
use http::StatusCode;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Error;

/// A successful response from the upstream API.
pub(crate) struct UpstreamResponse {
    pub(crate) status: StatusCode,
    pub(crate) body: Vec<u8>,
}

/// Client wrapping calls to the upstream API.
///
/// The server-held API key is attached to every outgoing request and never
/// reaches clients. Each inbound request maps to at most one upstream
/// attempt; there are no retries.
pub(crate) struct UpstreamClient {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl UpstreamClient {
    pub(crate) fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create upstream HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Perform a single GET against the upstream, forwarding the query
    /// parameters and injecting the API key.
    ///
    /// Non-2xx responses come back as [`Error::Upstream`] carrying the
    /// upstream's status, body, and content-type verbatim. Transport
    /// failures map to their own error kinds.
    pub(crate) async fn get(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> crate::Result<UpstreamResponse> {
        let url = self.base_url.join(path).map_err(|e| Error::UpstreamUnreachable {
            detail: format!("invalid upstream url for {path}: {e}"),
        })?;

        let mut request = self.client.get(url).query(params);

        if let Some(key) = &self.api_key {
            request = request.query(&[("apiKey", key.expose_secret())]);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                Error::UpstreamTimeout {
                    detail: error.to_string(),
                }
            } else {
                Error::UpstreamUnreachable {
                    detail: error.to_string(),
                }
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let content_type = response
                .headers()
                .get(http::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("application/json")
                .to_string();

            let body = read_body(response).await?;

            log::debug!("Upstream returned {status} with {} body bytes", body.len());

            return Err(Error::Upstream {
                status,
                content_type,
                body,
            });
        }

        let body = read_body(response).await?;

        Ok(UpstreamResponse { status, body })
    }
}

async fn read_body(response: reqwest::Response) -> crate::Result<Vec<u8>> {
    let bytes = response.bytes().await.map_err(|error| Error::UpstreamUnreachable {
        detail: format!("failed to read upstream body: {error}"),
    })?;

    Ok(bytes.to_vec())
}
