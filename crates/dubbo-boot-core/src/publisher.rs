//! Startup export of provider beans.
//!
//! [`ServicePublisher::publish`] runs once, before the async runtime starts.
//! It publishes the management health-check URL, resolves the export
//! interface of every marked bean and hands one [`ServiceConfig`] per bean to
//! the exporter. A bean without a resolvable interface aborts startup before
//! anything is exported.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

use tracing::{debug, info};

use crate::config::{DubboProperties, ManagementServerProperties, ServerProperties, Settings};
use crate::context::ApplicationContext;
use crate::errors::PublishError;
use crate::export::{ExportedService, Exporter, ServiceConfig};
use crate::protocol::ProtocolConfig;
use crate::service::ProviderBean;

/// Read by the RPC framework's own health-check polling.
pub const HTTP_CHECK_URL_ENV: &str = "DUBBO_HTTP_CHECK_URL";

/// Process-wide properties the publisher writes to.
pub trait Environment {
    fn set_property(&self, key: &str, value: &str);
}

/// Writes to the real process environment.
///
/// Only obtainable through the unsafe constructor:
///
/// ```compile_fail
/// let environment = dubbo_boot_core::ProcessEnvironment::new();
/// ```
///
/// ```compile_fail
/// let environment = dubbo_boot_core::ProcessEnvironment { _single_threaded: () };
/// ```
pub struct ProcessEnvironment {
    _single_threaded: (),
}

impl ProcessEnvironment {
    /// # Safety
    ///
    /// No other thread may read or write the process environment while the
    /// returned value is alive. In practice it must be created and dropped
    /// before any thread or async runtime is started.
    pub unsafe fn new() -> Self {
        Self {
            _single_threaded: (),
        }
    }
}

impl Environment for ProcessEnvironment {
    fn set_property(&self, key: &str, value: &str) {
        // SAFETY: upheld by the caller of `ProcessEnvironment::new`.
        unsafe { std::env::set_var(key, value) }
    }
}

/// Picks the interface a bean is exported under.
///
/// An explicit marker interface wins. Otherwise the first declared interface
/// is used, even when the bean declares several.
pub fn resolve_interface(bean: &ProviderBean) -> Result<String, PublishError> {
    if let Some(explicit) = bean.marker.as_ref().and_then(|m| m.explicit_interface()) {
        return Ok(explicit.to_string());
    }
    match bean.interfaces.first() {
        Some(first) => {
            if bean.interfaces.len() > 1 {
                debug!(
                    bean = %bean.name,
                    chosen = %first,
                    declared = bean.interfaces.len(),
                    "no explicit interface, exporting the first declared one"
                );
            }
            Ok(first.clone())
        }
        None => Err(PublishError::NoInterface {
            bean_type: bean.type_name.clone(),
        }),
    }
}

/// First non-loopback IPv4 address of this host, or `127.0.0.1`.
pub fn local_host() -> String {
    let fallback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let Ok(name) = hostname::get() else {
        return fallback.to_string();
    };
    let name = name.to_string_lossy().into_owned();

    (name.as_str(), 0)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| {
            addrs.find(|addr| {
                let ip = addr.ip();
                ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified()
            })
        })
        .map(|addr| addr.ip())
        .unwrap_or(fallback)
        .to_string()
}

pub fn resolve_http_check_url(settings: &Settings) -> String {
    resolve_http_check_url_with(
        &settings.dubbo,
        &settings.server,
        &settings.management,
        local_host,
    )
}

/// Builds `<scheme><host>:<port><context-path>/health` for the management
/// server unless an explicit URL is configured.
///
/// Host falls back from the management address to the server address to
/// `local_host`, which is only called when both are unset.
pub fn resolve_http_check_url_with(
    dubbo: &DubboProperties,
    server: &ServerProperties,
    management: &ManagementServerProperties,
    local_host: impl FnOnce() -> String,
) -> String {
    if let Some(url) = &dubbo.http_check_url {
        return url.clone();
    }

    let scheme = if management.ssl.is_some() {
        "https://"
    } else {
        "http://"
    };
    let port = management.effective_port(server);
    let host = management
        .address
        .or(server.address)
        .map(|addr| match addr {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        })
        .unwrap_or_else(local_host);

    format!("{scheme}{host}:{port}{}/health", management.context_path)
}

pub struct ServicePublisher<'a> {
    settings: &'a Settings,
    exporter: &'a dyn Exporter,
    environment: &'a dyn Environment,
}

impl<'a> ServicePublisher<'a> {
    pub fn new(
        settings: &'a Settings,
        exporter: &'a dyn Exporter,
        environment: &'a dyn Environment,
    ) -> Self {
        Self {
            settings,
            exporter,
            environment,
        }
    }

    pub fn publish(
        &self,
        context: &ApplicationContext,
    ) -> Result<Vec<ExportedService>, PublishError> {
        let http_check_url = resolve_http_check_url(self.settings);
        self.environment.set_property(HTTP_CHECK_URL_ENV, &http_check_url);
        info!(url = %http_check_url, "published {}", HTTP_CHECK_URL_ENV);

        let resolved = context
            .beans_with_marker()
            .map(|bean| resolve_interface(bean).map(|interface| (bean, interface)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut protocol = self.settings.dubbo.protocol.clone();
        if protocol.host.is_none() {
            protocol.host = Some(local_host());
        }

        let mut exported = Vec::with_capacity(resolved.len());
        for (bean, interface) in resolved {
            let config = self.service_config(bean, interface, &protocol, &http_check_url);
            let service = self.exporter.export(config)?;
            info!(
                bean = %service.bean_name,
                interface = %service.interface,
                url = %service.url,
                "exported remote service"
            );
            exported.push(service);
        }
        Ok(exported)
    }

    fn service_config(
        &self,
        bean: &ProviderBean,
        interface: String,
        protocol: &ProtocolConfig,
        http_check_url: &str,
    ) -> ServiceConfig {
        let dubbo = &self.settings.dubbo;
        ServiceConfig {
            application: dubbo.application_name.clone(),
            protocol: protocol.clone(),
            registry_address: dubbo.registry_address.clone(),
            interface,
            bean_name: bean.name.clone(),
            instance: bean.instance.clone(),
            http_check_url: http_check_url.to_string(),
            attributes: bean.marker.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::config::SslProperties;
    use crate::errors::ExportError;
    use crate::service::DubboService;

    #[derive(Default)]
    struct RecordingExporter {
        exported: RefCell<Vec<ServiceConfig>>,
        fail_on: Option<String>,
    }

    impl Exporter for RecordingExporter {
        fn export(&self, config: ServiceConfig) -> Result<ExportedService, ExportError> {
            if self.fail_on.as_deref() == Some(config.bean_name.as_str()) {
                return Err(ExportError::Registry("registry unreachable".into()));
            }
            let service = ExportedService::from_config(&config, 0)?;
            self.exported.borrow_mut().push(config);
            Ok(service)
        }
    }

    #[derive(Default)]
    struct MapEnvironment(RefCell<HashMap<String, String>>);

    impl Environment for MapEnvironment {
        fn set_property(&self, key: &str, value: &str) {
            self.0.borrow_mut().insert(key.to_string(), value.to_string());
        }
    }

    struct OrderService;
    struct Orphan;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.dubbo.application_name = "orders".into();
        settings.dubbo.protocol.host = Some("10.1.1.1".into());
        settings.server.address = Some("10.1.1.1".parse().unwrap());
        settings
    }

    #[test]
    fn single_declared_interface_is_selected() {
        let bean = ProviderBean::new("orders", OrderService)
            .implementing("com.example.OrderService")
            .with_marker(DubboService::new());
        assert_eq!(resolve_interface(&bean).unwrap(), "com.example.OrderService");
    }

    #[test]
    fn explicit_interface_takes_priority() {
        let bean = ProviderBean::new("orders", OrderService)
            .implementing("com.example.OrderService")
            .with_marker(DubboService::new().interface("com.example.Billing"));
        assert_eq!(resolve_interface(&bean).unwrap(), "com.example.Billing");
    }

    #[test]
    fn first_of_several_interfaces_is_selected() {
        let bean = ProviderBean::new("orders", OrderService)
            .implementing("com.example.OrderService")
            .implementing("com.example.Auditable")
            .with_marker(DubboService::new());
        assert_eq!(resolve_interface(&bean).unwrap(), "com.example.OrderService");
    }

    #[test]
    fn no_interface_fails_naming_the_bean_type() {
        let bean = ProviderBean::new("orphan", Orphan).with_marker(DubboService::new().interface(""));
        let err = resolve_interface(&bean).unwrap_err();
        assert!(matches!(&err, PublishError::NoInterface { bean_type } if bean_type.ends_with("Orphan")));
        assert!(err.to_string().starts_with("Failed to export remote service class"));
        assert!(err.to_string().contains("Orphan"));
    }

    #[test]
    fn explicit_url_bypasses_derivation() {
        let mut dubbo = DubboProperties::default();
        dubbo.http_check_url = Some("http://lb.internal/ping".into());
        let url = resolve_http_check_url_with(
            &dubbo,
            &ServerProperties::default(),
            &ManagementServerProperties::default(),
            || panic!("local host must not be resolved"),
        );
        assert_eq!(url, "http://lb.internal/ping");
    }

    #[test]
    fn derived_url_prefers_management_settings() {
        let server = ServerProperties {
            port: 8080,
            address: Some("10.0.0.1".parse().unwrap()),
        };
        let management = ManagementServerProperties {
            port: Some(9090),
            address: Some("10.0.0.2".parse().unwrap()),
            context_path: "/manage".into(),
            ssl: Some(SslProperties {
                cert_path: "cert.pem".into(),
                key_path: "key.pem".into(),
            }),
        };
        let url = resolve_http_check_url_with(
            &DubboProperties::default(),
            &server,
            &management,
            || panic!("local host must not be resolved"),
        );
        assert_eq!(url, "https://10.0.0.2:9090/manage/health");
    }

    #[test]
    fn derived_url_falls_back_to_server_then_local_host() {
        let server = ServerProperties {
            port: 8081,
            address: Some("10.0.0.1".parse().unwrap()),
        };
        let url = resolve_http_check_url_with(
            &DubboProperties::default(),
            &server,
            &ManagementServerProperties::default(),
            || panic!("local host must not be resolved"),
        );
        assert_eq!(url, "http://10.0.0.1:8081/health");

        let url = resolve_http_check_url_with(
            &DubboProperties::default(),
            &ServerProperties::default(),
            &ManagementServerProperties::default(),
            || "192.168.1.20".to_string(),
        );
        assert_eq!(url, "http://192.168.1.20:8080/health");
    }

    #[test]
    fn derived_url_brackets_ipv6_addresses() {
        let server = ServerProperties {
            port: 8080,
            address: Some("::1".parse().unwrap()),
        };
        let url = resolve_http_check_url_with(
            &DubboProperties::default(),
            &server,
            &ManagementServerProperties::default(),
            || panic!("local host must not be resolved"),
        );
        assert_eq!(url, "http://[::1]:8080/health");

        let management = ManagementServerProperties {
            port: Some(9090),
            address: Some("fd00::2".parse().unwrap()),
            ..Default::default()
        };
        let url = resolve_http_check_url_with(
            &DubboProperties::default(),
            &server,
            &management,
            || panic!("local host must not be resolved"),
        );
        assert_eq!(url, "http://[fd00::2]:9090/health");
    }

    #[test]
    fn local_host_is_an_ipv4_address() {
        let host = local_host();
        assert!(host.parse::<Ipv4Addr>().is_ok(), "{host}");
    }

    #[test]
    fn publish_exports_marked_beans_and_sets_url() {
        let mut context = ApplicationContext::new();
        context
            .register_provider(
                ProviderBean::new("orderService", OrderService)
                    .implementing("com.example.OrderService")
                    .with_marker(DubboService::new().version("2.0.0")),
            )
            .unwrap();
        context.register_provider(ProviderBean::new("helper", Orphan)).unwrap();

        let settings = settings();
        let exporter = RecordingExporter::default();
        let environment = MapEnvironment::default();
        let exported = ServicePublisher::new(&settings, &exporter, &environment)
            .publish(&context)
            .unwrap();

        assert_eq!(exported.len(), 1);
        assert_eq!(
            environment.0.borrow().get(HTTP_CHECK_URL_ENV).map(String::as_str),
            Some("http://10.1.1.1:8080/health")
        );

        let configs = exporter.exported.borrow();
        let config = &configs[0];
        assert_eq!(config.application, "orders");
        assert_eq!(config.interface, "com.example.OrderService");
        assert_eq!(config.registry_address, settings.dubbo.registry_address);
        assert_eq!(config.http_check_url, "http://10.1.1.1:8080/health");
        assert_eq!(config.attributes.version.as_deref(), Some("2.0.0"));
        assert!(config.instance.downcast_ref::<OrderService>().is_some());
        assert!(exported[0].url.starts_with("dubbo://10.1.1.1:20880/com.example.OrderService?"));
    }

    #[test]
    fn unresolvable_bean_aborts_before_any_export() {
        let mut context = ApplicationContext::new();
        context
            .register_provider(
                ProviderBean::new("orderService", OrderService)
                    .implementing("com.example.OrderService")
                    .with_marker(DubboService::new()),
            )
            .unwrap();
        context
            .register_provider(ProviderBean::new("orphan", Orphan).with_marker(DubboService::new()))
            .unwrap();

        let settings = settings();
        let exporter = RecordingExporter::default();
        let environment = MapEnvironment::default();
        let err = ServicePublisher::new(&settings, &exporter, &environment)
            .publish(&context)
            .unwrap_err();

        assert!(matches!(err, PublishError::NoInterface { .. }));
        assert!(exporter.exported.borrow().is_empty());
    }

    #[test]
    fn export_errors_propagate() {
        let mut context = ApplicationContext::new();
        context
            .register_provider(
                ProviderBean::new("orderService", OrderService)
                    .implementing("com.example.OrderService")
                    .with_marker(DubboService::new()),
            )
            .unwrap();

        let settings = settings();
        let exporter = RecordingExporter {
            fail_on: Some("orderService".into()),
            ..Default::default()
        };
        let environment = MapEnvironment::default();
        let err = ServicePublisher::new(&settings, &exporter, &environment)
            .publish(&context)
            .unwrap_err();

        assert!(matches!(err, PublishError::Export(ExportError::Registry(_))));
    }
}
