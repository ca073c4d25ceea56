//! CLI command implementations.

pub mod headers;
pub mod image;
pub mod invoke;
pub mod normalize;

use clap::Args;

/// Arguments for the normalize command.
#[derive(Args)]
pub struct NormalizeArgs {
    /// Event JSON file, or `-` for stdin.
    #[arg(default_value = "-")]
    pub event: String,
}

/// Arguments for the headers command.
#[derive(Args)]
pub struct HeadersArgs {
    /// Request path the response belongs to.
    #[arg(short, long, default_value = "/")]
    pub path: String,

    /// Response header as `name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Host the platform routed to.
    #[arg(long)]
    pub internal_host: Option<String>,

    /// Host the client asked for (`x-forwarded-host`).
    #[arg(long)]
    pub external_host: Option<String>,
}

/// Arguments for the image command.
#[derive(Args)]
pub struct ImageArgs {
    /// Source image: a path inside the bucket, or an absolute http(s) URL.
    #[arg(short, long)]
    pub url: String,

    /// Target width.
    #[arg(short, long)]
    pub width: u32,

    /// Quality, 1-100.
    #[arg(short, long, default_value_t = 75)]
    pub quality: u8,

    /// Accept header to negotiate the output format with.
    #[arg(long)]
    pub accept: Option<String>,

    /// Directory standing in for the content store.
    #[arg(long, default_value = ".")]
    pub root: String,

    /// Bucket directory under the root (default: the configured bucket).
    #[arg(long)]
    pub bucket: Option<String>,

    /// Write the optimized bytes here.
    #[arg(short, long)]
    pub out: Option<String>,
}

/// Arguments for the invoke command.
#[derive(Args)]
pub struct InvokeArgs {
    /// Event JSON file, or `-` for stdin.
    #[arg(default_value = "-")]
    pub event: String,

    /// Use streaming mode (default: read from `STREAMIFY`).
    #[arg(long)]
    pub stream: bool,

    /// Cache-Control the demo page responds with.
    #[arg(long, default_value = "s-maxage=60")]
    pub cache_control: String,

    /// Directory standing in for the content store.
    #[arg(long, default_value = ".")]
    pub root: String,
}

/// Split `name: value` into its parts.
pub fn parse_header_arg(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}
