use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Protocol {
    Dubbo,
    Rmi,
    Hessian,
    Http,
    Grpc,
    Custom(String),
}

impl Protocol {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "dubbo" => Protocol::Dubbo,
            "rmi" => Protocol::Rmi,
            "hessian" => Protocol::Hessian,
            "http" => Protocol::Http,
            "grpc" => Protocol::Grpc,
            _ => Protocol::Custom(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Protocol::Dubbo => "dubbo",
            Protocol::Rmi => "rmi",
            Protocol::Hessian => "hessian",
            Protocol::Http => "http",
            Protocol::Grpc => "grpc",
            Protocol::Custom(name) => name,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Protocol a provider is exported over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub protocol: Protocol,
    /// Advertised host; the local host address is used when unset
    pub host: Option<String>,
    pub port: u16,
}

impl ProtocolConfig {
    pub fn new(protocol: Protocol, port: u16) -> Self {
        Self {
            protocol,
            host: None,
            port,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::new(Protocol::Dubbo, 20880)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_custom_names() {
        assert_eq!(Protocol::parse("DUBBO"), Protocol::Dubbo);
        assert_eq!(Protocol::parse("grpc"), Protocol::Grpc);
        assert_eq!(Protocol::parse("thrift"), Protocol::Custom("thrift".into()));
        assert_eq!(Protocol::parse("thrift").to_string(), "thrift");
    }
}
