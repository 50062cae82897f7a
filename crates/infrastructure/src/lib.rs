//! Courier Infrastructure - Adapters and implementations
//!
//! Concrete implementations of the ports defined in the application layer:
//! the reqwest dispatcher, the boa script engine, the file-backed
//! environment store and settings loading.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod scripting;
pub mod serialization;

pub use adapters::ReqwestDispatcher;
pub use config::{ConfigError, load_settings};
pub use persistence::FileEnvironmentStore;
pub use scripting::{BODY_NOT_AVAILABLE, BoaScriptEngine, LibraryError};
pub use serialization::{SerializationError, from_json, to_json_stable};
