pub mod config;
pub mod diagnosis;
pub mod error;
pub mod model;
pub mod preprocessing;
pub mod server;

// Re-export common types
pub use error::InferenceError;
