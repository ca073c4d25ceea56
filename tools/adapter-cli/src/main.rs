//! Adapter CLI - local development tool for the serverless SSR adapter.
//!
//! Commands:
//! - `ssr-adapter normalize` - Normalize a platform event
//! - `ssr-adapter headers` - Run the header rewrite pipeline
//! - `ssr-adapter image` - Optimize an image from a local directory
//! - `ssr-adapter invoke` - Run an event end to end against a demo page

mod commands;
mod context;
mod output;

use adapter_observability::{init_logging, LogConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{HeadersArgs, ImageArgs, InvokeArgs, NormalizeArgs};

/// Adapter CLI - exercise the SSR adapter locally
#[derive(Parser)]
#[command(name = "ssr-adapter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a platform event into the internal request
    Normalize(NormalizeArgs),

    /// Apply the header rewrite pipeline to a set of headers
    Headers(HeadersArgs),

    /// Optimize an image served from a local directory
    Image(ImageArgs),

    /// Invoke the adapter with an event and a demo page
    Invoke(InvokeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let log_config = if cli.verbose {
        LogConfig::development()
    } else {
        ctx.config.logging
    };
    if let Err(e) = init_logging(log_config) {
        ctx.output.warn(&format!("Logging disabled: {}", e));
    }

    let result = match cli.command {
        Commands::Normalize(args) => commands::normalize::run(args, &ctx).await,
        Commands::Headers(args) => commands::headers::run(args, &ctx).await,
        Commands::Image(args) => commands::image::run(args, &ctx).await,
        Commands::Invoke(args) => commands::invoke::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
