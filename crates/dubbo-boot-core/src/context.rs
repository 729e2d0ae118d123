use std::sync::Arc;

use tracing::debug;

use crate::errors::ContextError;
use crate::reference::{ReferenceHandle, ReferenceRegistry};
use crate::service::ProviderBean;

/// Holds the provider beans and the remote references of one application.
#[derive(Default)]
pub struct ApplicationContext {
    beans: Vec<ProviderBean>,
    references: Arc<ReferenceRegistry>,
}

impl ApplicationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&mut self, bean: ProviderBean) -> Result<(), ContextError> {
        if self.beans.iter().any(|existing| existing.name == bean.name) {
            return Err(ContextError::DuplicateBean(bean.name));
        }
        debug!(bean = %bean.name, remote = bean.is_remote_service(), "registered bean");
        self.beans.push(bean);
        Ok(())
    }

    pub fn get_bean(&self, name: &str) -> Option<&ProviderBean> {
        self.beans.iter().find(|bean| bean.name == name)
    }

    pub fn beans(&self) -> impl Iterator<Item = &ProviderBean> {
        self.beans.iter()
    }

    /// Beans carrying the remote service marker, in registration order.
    pub fn beans_with_marker(&self) -> impl Iterator<Item = &ProviderBean> {
        self.beans.iter().filter(|bean| bean.is_remote_service())
    }

    pub fn register_reference(
        &self,
        name: impl Into<String>,
        reference: ReferenceHandle,
    ) -> Result<(), ContextError> {
        let name = name.into();
        debug!(reference = %name, "registered remote reference");
        self.references.register(name, reference)
    }

    pub fn references(&self) -> Arc<ReferenceRegistry> {
        Arc::clone(&self.references)
    }
}
