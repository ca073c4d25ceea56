//! Cache-Control policies and response header rewriting.
//!
//! This crate provides:
//! - `CacheControl` - Parsed Cache-Control directive list
//! - `ResponseCachePolicy` - Document and static-asset cache policies
//! - `HeaderPipeline` - Ordered, pure header rewrite stages applied before commit
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use adapter_cache::{CachePolicies, HeaderPipeline, RewriteContext};
//!
//! let context = RewriteContext::new("/about", Arc::new(CachePolicies::default()));
//! let pipeline = HeaderPipeline::standard(context);
//! let headers = pipeline.apply(staged_headers);
//! ```

mod control;
mod headers;
mod pipeline;
mod policy;

pub use control::*;
pub use headers::*;
pub use pipeline::*;
pub use policy::*;
