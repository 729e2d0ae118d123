pub mod config;
pub mod context;
pub mod errors;
pub mod export;
pub mod health;
pub mod prober;
pub mod protocol;
pub mod publisher;
pub mod reference;
pub mod registry;
pub mod service;
pub mod time;

pub use config::{ManagementServerProperties, ReferenceConfig, ServerProperties, Settings};
pub use context::ApplicationContext;
pub use errors::{ConfigError, ContextError, ExportError, PublishError, RpcError};
pub use export::{ExportedService, Exporter, ServiceConfig};
pub use health::{Health, HealthStatus};
pub use prober::DubboHealthIndicator;
pub use protocol::{Protocol, ProtocolConfig};
pub use publisher::{Environment, ProcessEnvironment, ServicePublisher, HTTP_CHECK_URL_ENV};
pub use reference::{EchoService, HttpEchoReference, ReferenceRegistry};
pub use registry::{RegistryError, RegistryStore};
pub use service::{DubboService, ProviderBean};
