//! Event normalization.

use adapter_event::{InboundEvent, Normalized};
use anyhow::Result;

use super::NormalizeArgs;
use crate::context::Context;

/// Run the normalize command.
pub async fn run(args: NormalizeArgs, ctx: &Context) -> Result<()> {
    let raw = ctx.read_json(&args.event)?;
    let inbound = InboundEvent::detect(raw)?;
    let kind = inbound.kind();
    ctx.output.debug(&format!("Detected {} event", kind));

    match inbound.into_normalized()? {
        Normalized::Warmer => {
            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({ "warmer": true }));
            } else {
                ctx.output.success("Warmer event: the adapter answers 200 OK");
            }
        }
        Normalized::Request(event) => {
            if ctx.output.is_json() {
                ctx.output.json(&event);
                return Ok(());
            }
            ctx.output.section(&format!("{} {}", event.method, event.raw_path));
            ctx.output.field("Source", kind);
            ctx.output.field("URL", &event.url());
            if let Some(host) = &event.internal_host {
                ctx.output.field("Internal host", host);
            }
            if let Some(addr) = &event.remote_address {
                ctx.output.field("Remote address", addr);
            }
            if let Some(body) = &event.body {
                ctx.output.field("Body", &crate::output::format_bytes(body.len() as u64));
            }

            ctx.output.section("Headers");
            ctx.output.header_map(&event.headers);
            if !event.cookies.is_empty() {
                ctx.output.section("Cookies");
                for cookie in &event.cookies {
                    ctx.output.item(cookie);
                }
            }
        }
    }

    Ok(())
}
