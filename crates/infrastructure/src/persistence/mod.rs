//! Persistence adapters.

mod environment_file;

pub use environment_file::FileEnvironmentStore;
