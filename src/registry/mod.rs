/*!
 * Registry Module
 * Persistent process registry: contract and backends
 */

pub mod memory;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use memory::MemoryRegistry;
pub use sqlite::SqliteRegistry;
pub use traits::RegistryClient;
pub use types::{ProcessRecord, ProcessStatus};

#[cfg(test)]
pub use traits::MockRegistryClient;

use crate::core::config::{RegistryBackend, SupervisorConfig};
use crate::core::errors::ConnectionError;
use std::sync::Arc;
use tracing::info;

/// Open the registry selected by the configuration
pub fn open(config: &SupervisorConfig) -> Result<Arc<dyn RegistryClient>, ConnectionError> {
    match config.registry {
        RegistryBackend::Sqlite => {
            let registry = SqliteRegistry::open(&config.registry_path)?;
            Ok(Arc::new(registry))
        }
        RegistryBackend::Memory => {
            info!("Using in-memory registry; records are lost on exit");
            Ok(Arc::new(MemoryRegistry::new()))
        }
    }
}
