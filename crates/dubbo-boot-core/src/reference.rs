use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::errors::{ContextError, RpcError};

/// Round-trip liveness call every remote reference supports.
#[async_trait]
pub trait EchoService: Send + Sync {
    async fn echo(&self, message: &str) -> Result<String, RpcError>;
}

pub type ReferenceHandle = Arc<dyn EchoService>;

/// Remote references keyed by bean name, in insertion order.
///
/// Entries are only ever appended; readers work on a cloned snapshot so no
/// lock is held while a remote call is in flight.
#[derive(Default)]
pub struct ReferenceRegistry {
    entries: RwLock<Vec<(String, ReferenceHandle)>>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        reference: ReferenceHandle,
    ) -> Result<(), ContextError> {
        let name = name.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.iter().any(|(existing, _)| *existing == name) {
            return Err(ContextError::DuplicateReference(name));
        }
        entries.push((name, reference));
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<(String, ReferenceHandle)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reference to a provider reachable over HTTP.
///
/// Echo is a POST of the payload to `<base_url>/rpc/<interface>/echo`, which
/// must answer with the same body.
#[derive(Debug, Clone)]
pub struct HttpEchoReference {
    pub interface: String,
    pub base_url: String,
    echo_url: Url,
    client: Client,
}

impl HttpEchoReference {
    pub fn new(
        interface: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let (interface, base_url) = (interface.into(), base_url.into());
        let echo_url = echo_url(&base_url, &interface)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            interface,
            base_url,
            echo_url,
            client,
        })
    }

    pub fn echo_url(&self) -> &Url {
        &self.echo_url
    }
}

/// `<base_url>/rpc/<interface>/echo`, with the interface encoded as a single
/// path segment.
fn echo_url(base_url: &str, interface: &str) -> Result<Url, RpcError> {
    let mut url =
        Url::parse(base_url).map_err(|e| RpcError::InvalidUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| RpcError::InvalidUrl(format!("{base_url}: cannot carry a path")))?
        .pop_if_empty()
        .extend(["rpc", interface, "echo"]);
    Ok(url)
}

#[async_trait]
impl EchoService for HttpEchoReference {
    async fn echo(&self, message: &str) -> Result<String, RpcError> {
        let res = self
            .client
            .post(self.echo_url.clone())
            .body(message.to_string())
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            return Err(RpcError::Status(res.status().as_u16()));
        }

        let body = res
            .text()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        if body != message {
            return Err(RpcError::Mismatch {
                expected: message.to_string(),
                actual: body,
            });
        }
        Ok(body)
    }
}
