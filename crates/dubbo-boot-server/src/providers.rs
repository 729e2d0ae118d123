use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use dubbo_boot_core::{
    ApplicationContext, ContextError, DubboService, HttpEchoReference, ProviderBean, Settings,
};
use tracing::info;

pub const GREETING_INTERFACE: &str = "org.dubbo.boot.GreetingService";

/// Sample provider hosted by the server.
#[derive(Debug, Default)]
pub struct GreetingProvider;

pub fn provider_context() -> Result<ApplicationContext, ContextError> {
    let mut context = ApplicationContext::new();
    context.register_provider(
        ProviderBean::new("greetingService", GreetingProvider)
            .implementing(GREETING_INTERFACE)
            .with_marker(DubboService::new().version("1.0.0")),
    )?;
    Ok(context)
}

/// Creates one HTTP echo reference per configured `DUBBO_REFERENCES` entry.
pub fn register_references(
    context: &ApplicationContext,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    let timeout = Duration::from_millis(settings.dubbo.reference_timeout_ms);
    for declared in &settings.dubbo.references {
        let reference = HttpEchoReference::new(&declared.interface, &declared.base_url, timeout)?;
        context.register_reference(&declared.name, Arc::new(reference))?;
        info!(reference = %declared.name, interface = %declared.interface, url = %declared.base_url, "remote reference declared");
    }
    Ok(())
}
