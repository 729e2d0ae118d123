//! Settings read from the process environment.
//!
//! Every loader takes a lookup function so tests can feed a map instead of
//! mutating the real environment.

use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::protocol::{Protocol, ProtocolConfig};

pub const DEFAULT_REGISTRY_ADDRESS: &str = "sqlite://dubbo-registry.db";
pub const DEFAULT_REFERENCE_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub name: String,
    pub interface: String,
    pub base_url: String,
}

impl FromStr for ReferenceConfig {
    type Err = ConfigError;

    /// Parses `name=interface@base_url`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::invalid("DUBBO_REFERENCES", s);
        let (name, rest) = s.split_once('=').ok_or_else(invalid)?;
        let (interface, base_url) = rest.split_once('@').ok_or_else(invalid)?;
        let (name, interface, base_url) = (name.trim(), interface.trim(), base_url.trim());
        if name.is_empty() || interface.is_empty() || base_url.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            interface: interface.to_string(),
            base_url: base_url.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubboProperties {
    pub application_name: String,
    pub protocol: ProtocolConfig,
    pub registry_address: String,
    /// Explicit health-check URL; bypasses derivation when set
    pub http_check_url: Option<String>,
    pub references: Vec<ReferenceConfig>,
    pub reference_timeout_ms: u64,
}

impl Default for DubboProperties {
    fn default() -> Self {
        Self {
            application_name: "dubbo-boot".to_string(),
            protocol: ProtocolConfig::default(),
            registry_address: DEFAULT_REGISTRY_ADDRESS.to_string(),
            http_check_url: None,
            references: Vec::new(),
            reference_timeout_ms: DEFAULT_REFERENCE_TIMEOUT_MS,
        }
    }
}

impl DubboProperties {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let protocol = ProtocolConfig {
            protocol: lookup("DUBBO_PROTOCOL_NAME")
                .map(|name| Protocol::parse(&name))
                .unwrap_or(defaults.protocol.protocol),
            host: lookup("DUBBO_PROTOCOL_HOST").filter(|host| !host.is_empty()),
            port: parse_or(lookup, "DUBBO_PROTOCOL_PORT", defaults.protocol.port)?,
        };

        let references = match lookup("DUBBO_REFERENCES") {
            Some(raw) => raw
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<ReferenceConfig>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            application_name: lookup("DUBBO_APPLICATION_NAME")
                .unwrap_or(defaults.application_name),
            protocol,
            registry_address: lookup("DUBBO_REGISTRY_ADDRESS")
                .unwrap_or(defaults.registry_address),
            http_check_url: lookup("DUBBO_HTTP_CHECK_URL").filter(|url| !url.is_empty()),
            references,
            reference_timeout_ms: parse_or(
                lookup,
                "DUBBO_REFERENCE_TIMEOUT_MS",
                defaults.reference_timeout_ms,
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProperties {
    pub port: u16,
    pub address: Option<IpAddr>,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            port: 8080,
            address: None,
        }
    }
}

impl ServerProperties {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_or(lookup, "SERVER_PORT", Self::default().port)?,
            address: parse_opt(lookup, "SERVER_ADDRESS")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslProperties {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementServerProperties {
    pub port: Option<u16>,
    pub address: Option<IpAddr>,
    pub context_path: String,
    pub ssl: Option<SslProperties>,
}

impl ManagementServerProperties {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ssl = match (lookup("MANAGEMENT_SSL_CERT"), lookup("MANAGEMENT_SSL_KEY")) {
            (Some(cert_path), Some(key_path)) => Some(SslProperties { cert_path, key_path }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("MANAGEMENT_SSL_KEY".into())),
            (None, Some(_)) => return Err(ConfigError::Missing("MANAGEMENT_SSL_CERT".into())),
        };

        Ok(Self {
            port: parse_opt(lookup, "MANAGEMENT_PORT")?,
            address: parse_opt(lookup, "MANAGEMENT_ADDRESS")?,
            context_path: normalize_context_path(
                &lookup("MANAGEMENT_CONTEXT_PATH").unwrap_or_default(),
            ),
            ssl,
        })
    }

    /// Port the management endpoints are served on.
    pub fn effective_port(&self, server: &ServerProperties) -> u16 {
        self.port.unwrap_or(server.port)
    }
}

/// All settings needed to boot the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub dubbo: DubboProperties,
    pub server: ServerProperties,
    pub management: ManagementServerProperties,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            dubbo: DubboProperties::from_lookup(lookup)?,
            server: ServerProperties::from_lookup(lookup)?,
            management: ManagementServerProperties::from_lookup(lookup)?,
        })
    }
}

/// `""` and `"/"` mean no context path; anything else gets a leading slash
/// and loses any trailing one.
pub fn normalize_context_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_opt<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, value)),
        None => Ok(None),
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.dubbo.protocol.port, 20880);
        assert_eq!(settings.management.effective_port(&settings.server), 8080);
    }

    #[test]
    fn reads_every_section() {
        let settings = Settings::from_lookup(&lookup_from(&[
            ("DUBBO_APPLICATION_NAME", "orders"),
            ("DUBBO_PROTOCOL_NAME", "grpc"),
            ("DUBBO_PROTOCOL_PORT", "50051"),
            ("DUBBO_HTTP_CHECK_URL", "http://lb/health"),
            ("DUBBO_REFERENCES", "users=com.example.UserService@http://10.0.0.2:8080, "),
            ("SERVER_PORT", "9000"),
            ("SERVER_ADDRESS", "10.0.0.1"),
            ("MANAGEMENT_PORT", "9001"),
            ("MANAGEMENT_CONTEXT_PATH", "actuator/"),
        ]))
        .unwrap();

        assert_eq!(settings.dubbo.application_name, "orders");
        assert_eq!(settings.dubbo.protocol.protocol, Protocol::Grpc);
        assert_eq!(settings.dubbo.protocol.port, 50051);
        assert_eq!(settings.dubbo.http_check_url.as_deref(), Some("http://lb/health"));
        assert_eq!(
            settings.dubbo.references,
            vec![ReferenceConfig {
                name: "users".into(),
                interface: "com.example.UserService".into(),
                base_url: "http://10.0.0.2:8080".into(),
            }]
        );
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.address, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(settings.management.effective_port(&settings.server), 9001);
        assert_eq!(settings.management.context_path, "/actuator");
    }

    #[test]
    fn rejects_bad_values() {
        let err = Settings::from_lookup(&lookup_from(&[("SERVER_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "SERVER_PORT"));

        let err = Settings::from_lookup(&lookup_from(&[("DUBBO_REFERENCES", "users")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = Settings::from_lookup(&lookup_from(&[("MANAGEMENT_SSL_CERT", "cert.pem")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(key) if key == "MANAGEMENT_SSL_KEY"));
    }

    #[test]
    fn context_path_normalization() {
        assert_eq!(normalize_context_path(""), "");
        assert_eq!(normalize_context_path("/"), "");
        assert_eq!(normalize_context_path("manage"), "/manage");
        assert_eq!(normalize_context_path("/manage/"), "/manage");
    }
}
