use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::HeaderMap;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use tracing::trace;

use super::BackendGateway;
use super::GatewayResult;
use super::KvPair;
use super::Listing;
use crate::ClientConfig;
use crate::GatewayError;

const INDEX_HEADER: &str = "X-Consul-Index";
const TOKEN_HEADER: &str = "X-Consul-Token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KvEntry {
    key: String,
    /// Base64 encoded; `null` for keys holding no data
    #[serde(default)]
    value: Option<String>,
}

impl KvEntry {
    fn into_pair(self) -> GatewayResult<KvPair> {
        let value = match self.value {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| GatewayError::Decode(format!("value of {}: {}", self.key, e)))?,
            None => Vec::new(),
        };
        Ok(KvPair { key: self.key, value })
    }
}

/// HTTP gateway for a Consul-compatible KV API
///
/// - `GET /v1/kv/{key}` point reads
/// - `GET /v1/kv/{prefix}?recurse=true&index=N&wait=Ts` blocking listings
/// - `GET /v1/agent/self` liveness probe
#[derive(Debug, Clone)]
pub struct ConsulGateway {
    http: Client,
    endpoint: String,
    token: Option<String>,
    request_timeout: Duration,
}

impl ConsulGateway {
    pub fn new(config: &ClientConfig) -> GatewayResult<Self> {
        let endpoint = config.endpoint();
        let http = Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::InvalidAddress(format!("{endpoint}: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            token: config.token.clone().filter(|t| !t.is_empty()),
            request_timeout: config.request_timeout(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(
        &self,
        path: &str,
        timeout: Duration,
    ) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.endpoint, path.trim_start_matches('/'));
        let mut builder = self.http.get(url).timeout(timeout);
        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> GatewayResult<Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(timeout)
            } else {
                e.into()
            }
        })
    }
}

fn parse_index(headers: &HeaderMap) -> GatewayResult<u64> {
    let raw = headers
        .get(INDEX_HEADER)
        .ok_or_else(|| GatewayError::Decode(format!("missing {INDEX_HEADER} header")))?;
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| GatewayError::Decode(format!("malformed {INDEX_HEADER} header: {raw:?}")))
}

fn unexpected(
    status: StatusCode,
    path: &str,
) -> GatewayError {
    GatewayError::UnexpectedStatus {
        status: status.as_u16(),
        path: path.to_string(),
    }
}

#[async_trait]
impl BackendGateway for ConsulGateway {
    async fn get(
        &self,
        key: &str,
    ) -> GatewayResult<Option<Vec<u8>>> {
        let path = format!("kv/{}", key.trim_start_matches('/'));
        let response = self
            .send(self.request(&path, self.request_timeout), self.request_timeout)
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                trace!(key, "key not found");
                Ok(None)
            }
            status if status.is_success() => {
                let entries: Vec<KvEntry> = response.json().await?;
                match entries.into_iter().next() {
                    Some(entry) => Ok(Some(entry.into_pair()?.value)),
                    None => Ok(None),
                }
            }
            status => Err(unexpected(status, &path)),
        }
    }

    async fn list(
        &self,
        prefix: &str,
        wait_index: u64,
        wait_timeout: Duration,
    ) -> GatewayResult<Listing> {
        let path = format!("kv/{}", prefix.trim_start_matches('/'));
        // The transport must outlive the server-side hold
        let timeout = wait_timeout + self.request_timeout;
        let wait = format!("{}s", wait_timeout.as_secs().max(1));
        let builder = self.request(&path, timeout).query(&[
            ("recurse", "true".to_string()),
            ("index", wait_index.to_string()),
            ("wait", wait),
        ]);
        let response = self.send(builder, timeout).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            let index = parse_index(response.headers())?;
            debug!(prefix, index, "prefix holds no keys");
            return Ok(Listing {
                entries: Vec::new(),
                index,
            });
        }
        if !status.is_success() {
            return Err(unexpected(status, &path));
        }

        let index = parse_index(response.headers())?;
        let entries: Vec<KvEntry> = response.json().await?;
        let entries = entries
            .into_iter()
            .map(KvEntry::into_pair)
            .collect::<GatewayResult<Vec<_>>>()?;

        trace!(prefix, index, count = entries.len(), "listing served");
        Ok(Listing { entries, index })
    }

    async fn ping(&self) -> GatewayResult<()> {
        let path = "agent/self";
        let response = self
            .send(self.request(path, self.request_timeout), self.request_timeout)
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(unexpected(status, path))
        }
    }
}
