use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::errors::ExportError;
use crate::protocol::ProtocolConfig;
use crate::service::DubboService;

/// Everything the RPC framework needs to export one provider bean.
#[derive(Clone)]
pub struct ServiceConfig {
    pub application: String,
    pub protocol: ProtocolConfig,
    pub registry_address: String,
    pub interface: String,
    pub bean_name: String,
    pub instance: Arc<dyn Any + Send + Sync>,
    /// Management health-check callback
    pub http_check_url: String,
    pub attributes: DubboService,
}

impl ServiceConfig {
    /// Provider URL in the `<protocol>://<host>:<port>/<interface>?<params>`
    /// form, parameters sorted by key.
    pub fn provider_url(&self) -> Result<String, ExportError> {
        let host = self
            .protocol
            .host
            .as_deref()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ExportError::InvalidDescriptor("protocol host is not set".into()))?;

        let mut params = BTreeMap::new();
        params.insert("application", self.application.clone());
        params.insert("bean.name", self.bean_name.clone());
        params.insert("interface", self.interface.clone());
        let attrs = &self.attributes;
        if let Some(version) = &attrs.version {
            params.insert("version", version.clone());
        }
        if let Some(group) = &attrs.group {
            params.insert("group", group.clone());
        }
        if let Some(timeout) = attrs.timeout_ms {
            params.insert("timeout", timeout.to_string());
        }
        if let Some(retries) = attrs.retries {
            params.insert("retries", retries.to_string());
        }
        if let Some(weight) = attrs.weight {
            params.insert("weight", weight.to_string());
        }
        if let Some(token) = &attrs.token {
            params.insert("token", token.clone());
        }

        let base = format!(
            "{}://{}:{}/",
            self.protocol.protocol,
            bracket_ipv6(host),
            self.protocol.port
        );
        let mut url = Url::parse(&base)
            .map_err(|e| ExportError::InvalidDescriptor(format!("{base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ExportError::InvalidDescriptor(format!("{base}: cannot carry a path")))?
            .pop_if_empty()
            .push(&self.interface);
        url.query_pairs_mut().extend_pairs(params);

        Ok(url.into())
    }
}

fn bracket_ipv6(host: &str) -> String {
    match host.parse::<Ipv6Addr>() {
        Ok(addr) => format!("[{addr}]"),
        Err(_) => host.to_string(),
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("application", &self.application)
            .field("protocol", &self.protocol)
            .field("registry_address", &self.registry_address)
            .field("interface", &self.interface)
            .field("bean_name", &self.bean_name)
            .field("http_check_url", &self.http_check_url)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// A provider as recorded by the registry after export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedService {
    pub id: Uuid,
    pub url: String,
    pub interface: String,
    pub application: String,
    pub bean_name: String,
    pub http_check_url: String,
    pub exported_at: u64,
}

impl ExportedService {
    pub fn from_config(config: &ServiceConfig, exported_at: u64) -> Result<Self, ExportError> {
        Ok(Self {
            id: Uuid::new_v4(),
            url: config.provider_url()?,
            interface: config.interface.clone(),
            application: config.application.clone(),
            bean_name: config.bean_name.clone(),
            http_check_url: config.http_check_url.clone(),
            exported_at,
        })
    }
}

/// The RPC framework's export operation. Takes ownership of the descriptor.
pub trait Exporter {
    fn export(&self, config: ServiceConfig) -> Result<ExportedService, ExportError>;
}
