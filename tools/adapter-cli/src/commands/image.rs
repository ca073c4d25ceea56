//! Local image optimization.

use std::sync::Arc;

use adapter_core::{Headers, QueryParams};
use adapter_image::{FsContentStore, HttpRemoteFetcher, ImageOptimizer, ImageResponse};
use anyhow::{Context as _, Result};

use super::ImageArgs;
use crate::context::Context;
use crate::output::format_bytes;

/// Bucket directory used when neither `--bucket` nor the config names one.
const DEFAULT_LOCAL_BUCKET: &str = "public";

/// Run the image command.
pub async fn run(args: ImageArgs, ctx: &Context) -> Result<()> {
    let root = ctx.resolve_path(&args.root);
    let bucket = args
        .bucket
        .clone()
        .or_else(|| ctx.config.bucket_name.clone())
        .unwrap_or_else(|| DEFAULT_LOCAL_BUCKET.to_string());
    ctx.output
        .debug(&format!("Reading local sources from {}", root.join(&bucket).display()));

    let optimizer = ImageOptimizer::new(
        Arc::new(ctx.config.images.clone()),
        Arc::new(FsContentStore::new(root)),
        Arc::new(HttpRemoteFetcher::new()),
    )
    .with_bucket(bucket, ctx.config.bucket_key_prefix.clone());

    let mut query = QueryParams::new();
    query.insert("url".to_string(), args.url.clone());
    query.insert("w".to_string(), args.width.to_string());
    query.insert("q".to_string(), args.quality.to_string());

    let mut headers = Headers::new();
    if let Some(accept) = &args.accept {
        headers.insert("accept", accept.clone());
    }

    let response = ImageResponse::from_result(optimizer.optimize(&headers, &query).await);

    if let Some(out) = &args.out {
        let path = ctx.resolve_path(out);
        std::fs::write(&path, &response.body)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        ctx.output.debug(&format!("Wrote {}", path.display()));
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "statusCode": response.status_code,
            "headers": response.headers,
            "bytes": response.body.len(),
        }));
        return Ok(());
    }

    ctx.output.section(&format!("Image {}", args.url));
    ctx.output.status(response.status_code);
    ctx.output.header_map(&response.headers);
    if response.status_code == 200 {
        ctx.output.field("Size", &format_bytes(response.body.len() as u64));
        ctx.output.success("Image optimized");
    } else {
        ctx.output.warn(&String::from_utf8_lossy(&response.body));
    }
    Ok(())
}
