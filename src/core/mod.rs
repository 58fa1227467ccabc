// Core infrastructure shared by the container and the flag barrier

pub mod config;
pub mod errors;

// Re-export commonly used types
pub use config::FlagSetConfig;
pub use errors::{FlagDagError, Result};
