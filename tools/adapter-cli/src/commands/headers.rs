//! Header rewrite pipeline preview.

use std::sync::Arc;

use adapter_cache::{HeaderPipeline, RewriteContext};
use adapter_core::Headers;
use anyhow::{bail, Result};

use super::{parse_header_arg, HeadersArgs};
use crate::context::Context;

/// Run the headers command.
pub async fn run(args: HeadersArgs, ctx: &Context) -> Result<()> {
    let mut headers = Headers::new();
    for raw in &args.headers {
        let Some((name, value)) = parse_header_arg(raw) else {
            bail!("Invalid header '{}', expected 'name: value'", raw);
        };
        headers.insert(name, value);
    }

    let mut rewrite = RewriteContext::new(&args.path, Arc::new(ctx.config.cache.clone()));
    match (args.internal_host, args.external_host) {
        (Some(internal), Some(external)) => rewrite = rewrite.with_hosts(internal, external),
        (None, None) => {}
        _ => bail!("--internal-host and --external-host must be given together"),
    }

    let pipeline = HeaderPipeline::standard(rewrite);
    ctx.output.debug(&format!("Stages: {}", pipeline.stage_names().join(" -> ")));
    let rewritten = pipeline.apply(headers.clone());

    if ctx.output.is_json() {
        ctx.output.json(&rewritten);
        return Ok(());
    }

    ctx.output.section(&format!("Rewritten headers for {}", args.path));
    for (name, value) in rewritten.iter() {
        let marker = if headers.get(name) == Some(value) { " " } else { "*" };
        ctx.output.item(&format!("{} {}: {}", marker, name, value));
    }
    Ok(())
}
