//! Service container for dependency injection

use super::traits::{ConfigProvider, MetadataProvider};
use crate::config::Config;
use crate::core::StitchResult;
use crate::metadata::InMemoryMetadata;
use std::path::Path;
use std::sync::Arc;

/// Service container for one generator pass
///
/// Holds the configuration and the metadata model behind trait objects so
/// tests can swap in their own implementations.
///
/// # Example (Production)
///
/// ```no_run
/// use stitch::di::ServiceContainer;
/// use stitch::metadata::InMemoryMetadata;
///
/// # fn example() -> stitch::core::StitchResult<()> {
/// let container = ServiceContainer::new(None, InMemoryMetadata::new())?;
/// assert!(container.config().auto_bind());
/// # Ok(())
/// # }
/// ```
///
/// # Example (Testing)
///
/// ```
/// use stitch::di::{ServiceContainer, mocks::MockConfigProvider};
/// use stitch::metadata::InMemoryMetadata;
/// use std::sync::Arc;
///
/// let config = Arc::new(MockConfigProvider::default());
/// let metadata = Arc::new(InMemoryMetadata::new());
///
/// let container = ServiceContainer::with_providers(config, metadata);
/// assert!(container.metadata().type_info("Missing").is_none());
/// ```
#[derive(Clone)]
pub struct ServiceContainer {
    pub config: Arc<dyn ConfigProvider>,
    pub metadata: Arc<dyn MetadataProvider>,
}

impl ServiceContainer {
    /// Create a container with the config loaded from disk
    ///
    /// `config_path` is optional; without it `stitch.yaml` in the working
    /// directory is used when present, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit config file is missing or invalid.
    pub fn new(config_path: Option<&Path>, metadata: InMemoryMetadata) -> StitchResult<Self> {
        let config = Config::load(config_path)?;
        Ok(Self {
            config: Arc::new(config),
            metadata: Arc::new(metadata),
        })
    }

    /// Create a container with custom provider implementations
    pub fn with_providers(
        config: Arc<dyn ConfigProvider>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self { config, metadata }
    }

    /// Get the configuration provider
    pub fn config(&self) -> &dyn ConfigProvider {
        self.config.as_ref()
    }

    /// Get the metadata provider
    pub fn metadata(&self) -> &dyn MetadataProvider {
        self.metadata.as_ref()
    }
}
