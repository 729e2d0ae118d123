use crate::ExportedService;
pub use crate::errors::RegistryError;

/// Storage behind a provider registry.
pub trait RegistryStore {
    fn add_provider(&self, provider: &ExportedService) -> Result<(), RegistryError>;
    fn get_providers(&self, interface: &str) -> Result<Vec<ExportedService>, RegistryError>;
    fn get_all_providers(&self) -> Result<Vec<ExportedService>, RegistryError>;
    fn remove_provider(&self, url: &str) -> Result<(), RegistryError>;
}
