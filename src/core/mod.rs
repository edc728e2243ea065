/*!
 * Core Module
 * Fundamental supervisor types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod serde;
pub mod types;

// Re-export for convenience
pub use config::{RegistryBackend, SupervisorArgs, SupervisorConfig, WorkerTemplate};
pub use errors::*;
pub use types::*;
