//! Entry points for the serverless SSR adapter.
//!
//! This crate wires the adapter together:
//! - `AdapterConfig` - Resolved configuration, loaded from TOML or JSON
//! - `Framework` - The rendering framework behind the adapter
//! - `Adapter` - Buffered and streaming entry points
//! - `AdapterError` - Unified error type
//!
//! # Example
//!
//! ```ignore
//! use adapter_runtime::{Adapter, AdapterConfig};
//!
//! let config = AdapterConfig::load("adapter.toml")?.with_env_overrides();
//! let adapter = Adapter::new(config, framework, store);
//! let result = adapter.handle_buffered(event).await;
//! ```

mod config;
mod error;
mod framework;
mod handler;

pub use config::*;
pub use error::*;
pub use framework::*;
pub use handler::*;
