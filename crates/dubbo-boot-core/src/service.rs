use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Marker declaring a bean as a remote service provider, with the attributes
/// passed through to the export descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubboService {
    /// Explicit export interface; takes priority over declared interfaces
    pub interface_name: Option<String>,
    pub version: Option<String>,
    pub group: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub weight: Option<u32>,
    pub token: Option<String>,
}

impl DubboService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interface_name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The explicit interface, treating an empty name as unset.
    pub fn explicit_interface(&self) -> Option<&str> {
        self.interface_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// A bean held by the application context.
///
/// Declared interfaces are supplied at registration time, in declaration
/// order; they stand in for the contracts the bean type implements.
#[derive(Clone)]
pub struct ProviderBean {
    pub name: String,
    pub type_name: String,
    pub interfaces: Vec<String>,
    pub marker: Option<DubboService>,
    pub instance: Arc<dyn Any + Send + Sync>,
}

impl ProviderBean {
    pub fn new<T: Any + Send + Sync>(name: impl Into<String>, instance: T) -> Self {
        Self {
            name: name.into(),
            type_name: std::any::type_name::<T>().to_string(),
            interfaces: Vec::new(),
            marker: None,
            instance: Arc::new(instance),
        }
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_marker(mut self, marker: DubboService) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn is_remote_service(&self) -> bool {
        self.marker.is_some()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }
}

impl fmt::Debug for ProviderBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBean")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("interfaces", &self.interfaces)
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}
