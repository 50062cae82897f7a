//! Adapter implementations for application ports.

mod reqwest_dispatcher;

pub use reqwest_dispatcher::ReqwestDispatcher;
