// Workpulse Library - Public API

// Re-export error types
pub mod error;
pub use error::{Result, WorkpulseError};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;

// Re-export commonly used types
pub use crate::core::config::ConfigStore;
pub use crate::core::monitor::{EngineConfig, MonitorEngine};
pub use crate::core::persist::PersistenceGateway;

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
