//! Pack calculator: optimal pack shipment plans over a configurable size set.
//!
//! The binary entry point is `src/main.rs`; this library exposes the engine,
//! stores and HTTP router for integration tests and embedding.

pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod pack;
pub mod shutdown;
pub mod store;
