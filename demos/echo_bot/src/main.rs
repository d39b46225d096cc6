//! Echo bot demo.
//!
//! Answers `/start`, echoes private messages, and greets groups, showing
//! route registration order and chat-type filtering.
//!
//! # Usage
//!
//! Long-poll mode:
//!
//! ```bash
//! cargo run -p echo-bot -- --token 123:abc
//! ```
//!
//! Webhook mode:
//!
//! ```bash
//! cargo run -p echo-bot -- --token 123:abc \
//!     --webhook-url https://bot.example.test/hook --webhook-listen 0.0.0.0:8443
//! ```

use anyhow::Result;
use clap::Parser;
use courier::prelude::*;
use serde_json::json;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "echo-bot", about = "Courier echo bot demo")]
struct Args {
    /// Bot API token.
    #[arg(long)]
    token: String,

    /// Bot API server base URL.
    #[arg(long, default_value = "https://api.telegram.org")]
    server: String,

    /// Webhook URL; runs in long-poll mode when omitted.
    #[arg(long, default_value = "")]
    webhook_url: String,

    /// Webhook listen address.
    #[arg(long, default_value = "0.0.0.0:8080")]
    webhook_listen: String,
}

/// Sends `text` back to the chat the update came from.
async fn reply(cx: &Cx, text: &str) -> HandlerResult {
    let Some(chat) = cx.update().chat() else {
        return Ok(());
    };
    cx.api()
        .call("sendMessage", json!({"chat_id": chat.id, "text": text}))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let router = Router::builder()
        .route(
            Route::on(UpdateKind::Message)
                .name("start")
                .filter(Command::new("start"))
                .handler_fn(|cx| async move {
                    reply(&cx, "hi! send me a message and I will echo it").await
                }),
        )
        .route(
            Route::on(UpdateKind::Message)
                .name("private-echo")
                .filter(chat_type([ChatType::Private]))
                .handler_fn(|cx| async move {
                    let text = cx.update().text().unwrap_or("(no text)").to_string();
                    reply(&cx, &text).await
                }),
        )
        .route(
            Route::on(UpdateKind::Message)
                .name("group")
                .filter(chat_type([ChatType::Group, ChatType::Supergroup]))
                .handler_fn(|cx| async move { reply(&cx, "this is a group chat response").await }),
        )
        .build();

    let mut overrides = CourierConfig::default();
    overrides.api.token = args.token;
    overrides.api.base_url = args.server;
    overrides.webhook.url = args.webhook_url;
    overrides.webhook.listen = args.webhook_listen;

    let runtime = CourierRuntime::builder()
        .merge(overrides)
        .router(router)
        .build()?;

    let mode = if runtime.config().webhook.enabled() {
        "webhook"
    } else {
        "long-poll"
    };
    info!(mode, "echo bot starting");

    runtime.run().await?;
    Ok(())
}
