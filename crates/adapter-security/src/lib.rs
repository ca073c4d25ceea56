//! Source allow-listing for the image proxy.
//!
//! This crate provides:
//! - `RemotePattern` - Protocol/host/port/path pattern for remote sources
//! - `RemoteAllowlist` - Pattern and legacy domain list checked before any fetch
//!
//! # Example
//!
//! ```ignore
//! use adapter_security::{RemoteAllowlist, RemotePattern};
//!
//! let allowlist = RemoteAllowlist::new()
//!     .with_pattern(RemotePattern::new("**.unsplash.com").with_protocol("https"))
//!     .with_domain("images.example.com");
//!
//! allowlist.check_url("https://images.unsplash.com/photo-1")?;
//! ```

mod allowlist;
mod pattern;

pub use allowlist::*;
pub use pattern::*;
