//! Dependency injection infrastructure for the generator itself
//!
//! The pass driver receives its configuration and metadata model through
//! traits, so tests can inject mocks.
//!
//! # Example (Testing)
//! ```
//! use stitch::di::{ServiceContainer, mocks::*};
//! use std::sync::Arc;
//!
//! let config = Arc::new(MockConfigProvider::default());
//! let metadata = Arc::new(TypeBuilder::class("Service").into_metadata());
//!
//! let container = ServiceContainer::with_providers(config, metadata);
//! ```

pub mod container;
pub mod mocks;
pub mod traits;

// Re-export key types
pub use container::ServiceContainer;
pub use traits::{ConfigProvider, MetadataProvider};
