//! End-to-end invocation against a demo page.

use std::sync::Arc;

use adapter_core::{InternalEvent, ResponseMode};
use adapter_image::FsContentStore;
use adapter_runtime::{Adapter, Framework, FrameworkError};
use adapter_streaming::{ResponseSink, StreamFrame};
use anyhow::Result;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;

use super::InvokeArgs;
use crate::context::Context;
use crate::output::{format_bytes, status_badge};

/// Minimal page that echoes the request, streamed in two chunks.
struct DemoPage {
    cache_control: String,
}

#[async_trait]
impl Framework for DemoPage {
    async fn handle(
        &self,
        event: &InternalEvent,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), FrameworkError> {
        sink.set_status(200)?;
        sink.set_header("content-type", "text/html; charset=utf-8")?;
        sink.set_header("cache-control", &self.cache_control)?;
        sink.write(b"<!doctype html><html><body>").await?;
        let body = format!("<h1>{} {}</h1></body></html>", event.method, event.raw_path);
        sink.write(body.as_bytes()).await?;
        sink.end().await?;
        Ok(())
    }
}

/// Run the invoke command.
pub async fn run(args: InvokeArgs, ctx: &Context) -> Result<()> {
    let raw = ctx.read_json(&args.event)?;
    let page = Arc::new(DemoPage {
        cache_control: args.cache_control.clone(),
    });
    let store = Arc::new(FsContentStore::new(ctx.resolve_path(&args.root)));

    let mut adapter = Adapter::new(ctx.config.clone(), page, store);
    if args.stream {
        adapter = adapter.with_mode(ResponseMode::Streaming);
    }
    ctx.output.debug(&format!("Mode: {:?}", adapter.mode()));

    if adapter.mode().is_streaming() {
        invoke_streaming(&adapter, raw, ctx).await
    } else {
        let result = adapter.handle_buffered(raw).await;
        if ctx.output.is_json() {
            ctx.output.json(&result);
            return Ok(());
        }
        ctx.output.section("Buffered result");
        ctx.output.status(result.status_code);
        ctx.output.header_map(&result.headers);
        for cookie in &result.cookies {
            ctx.output.field("set-cookie", cookie);
        }
        ctx.output.field("Base64", &result.is_base64_encoded.to_string());
        ctx.output.field("Body", &result.body);
        Ok(())
    }
}

async fn invoke_streaming(adapter: &Adapter, raw: serde_json::Value, ctx: &Context) -> Result<()> {
    let (tx, rx) = mpsc::unbounded::<StreamFrame>();
    let (outcome, frames) = tokio::join!(adapter.handle_streaming(raw, tx), rx.collect::<Vec<_>>());

    if ctx.output.is_json() {
        let frames: Vec<_> = frames
            .iter()
            .map(|frame| match frame {
                StreamFrame::Head(head) => serde_json::json!({ "head": head }),
                StreamFrame::Chunk(bytes) => {
                    serde_json::json!({ "chunk": String::from_utf8_lossy(bytes) })
                }
            })
            .collect();
        ctx.output.json(&frames);
    } else {
        ctx.output.section("Stream frames");
        for (i, frame) in frames.iter().enumerate() {
            match frame {
                StreamFrame::Head(head) => {
                    ctx.output.field(&format!("[{}] head", i), &status_badge(head.status_code));
                    ctx.output.header_map(&head.headers);
                }
                StreamFrame::Chunk(bytes) => ctx.output.field(
                    &format!("[{}] chunk", i),
                    &format!("{} {}", format_bytes(bytes.len() as u64), String::from_utf8_lossy(bytes)),
                ),
            }
        }
    }

    outcome?;
    Ok(())
}
