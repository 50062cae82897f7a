//! JavaScript execution for pre-request and post-response scripts.
//!
//! Each run gets a fresh boa context. The `pm` object, the console and the
//! bundled libraries are installed by JavaScript factories that receive a
//! private host object; script code never sees the natives directly.

mod bridge;
mod convert;
mod engine;
pub mod libraries;
mod sandbox;

pub use bridge::BODY_NOT_AVAILABLE;
pub use engine::BoaScriptEngine;
pub use libraries::LibraryError;
