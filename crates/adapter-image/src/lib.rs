//! On-demand image optimization.
//!
//! This crate provides:
//! - `ImageConfig` - Allowed sizes, output formats and remote sources
//! - `ImageParams` - Validated transform request (`url`, `w`, `q`, `accept`)
//! - `ContentStore` / `RemoteFetcher` - Where source images come from
//! - `ImageTransformer` - Resize and re-encode, with an `image`-crate default
//! - `ImageOptimizer` - Validate, fetch, transform
//! - `ImageResponse` - Response shaping shared by buffered and streaming mode
//!
//! Validation always completes before any network or storage access.

mod config;
mod detect;
mod error;
mod fetch;
mod params;
mod response;
mod service;
mod source;
mod transform;

pub use config::*;
pub use detect::*;
pub use error::*;
pub use fetch::*;
pub use params::*;
pub use response::*;
pub use service::*;
pub use source::*;
pub use transform::*;
