/// Errors raised while exporting provider beans at startup
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(
        "Failed to export remote service class {bean_type}, cause: the service marker defines no interface name and the service class implements no interfaces"
    )]
    NoInterface { bean_type: String },

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Errors returned by an exporter
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Registry failure: {0}")]
    Registry(String),

    #[error("Invalid export descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Errors raised by a remote reference call
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote call failed with status {0}")]
    Status(u16),

    #[error("Echo mismatch: expected {expected:?}, got {actual:?}")]
    Mismatch { expected: String, actual: String },

    #[error("Invalid reference URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Duplicate provider bean: {0}")]
    DuplicateBean(String),

    #[error("Duplicate reference bean: {0}")]
    DuplicateReference(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("Missing {0}")]
    Missing(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
        }
    }
}
