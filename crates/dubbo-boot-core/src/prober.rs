use std::sync::Arc;

use tracing::{debug, warn};

use crate::health::Health;
use crate::reference::ReferenceRegistry;

pub const ECHO_PAYLOAD: &str = "Hello";
pub const DETAIL_KEY: &str = "Dubbo";

/// Echoes through every remote reference; the first failure marks the
/// application down.
#[derive(Clone)]
pub struct DubboHealthIndicator {
    references: Arc<ReferenceRegistry>,
}

impl DubboHealthIndicator {
    pub fn new(references: Arc<ReferenceRegistry>) -> Self {
        Self { references }
    }

    pub async fn health(&self) -> Health {
        let references = self.references.snapshot();
        for (name, reference) in references {
            debug!(reference = %name, "echo");
            if let Err(e) = reference.echo(ECHO_PAYLOAD).await {
                warn!(reference = %name, error = %e, "remote reference is down");
                return Health::down().with_detail(DETAIL_KEY, e.to_string());
            }
        }
        Health::up()
    }
}
