//! # Courier
//!
//! A filter-routed update dispatch framework for bot backends.
//!
//! ## Overview
//!
//! Courier receives a stream of updates from a remote message platform,
//! either by long polling or over a webhook, and routes each one to exactly
//! one handler chosen by composable filters. Routes are tried in
//! registration order; the first whose filters all allow the update wins.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────┐     ┌────────────────────┐
//! │ Poller / Webhook │────▶│   Router   │────▶│ middleware-wrapped │
//! │ (courier-transport)│   │ (filters)  │     │ handler            │
//! └──────────────────┘     └────────────┘     └────────────────────┘
//!          ▲                      │
//!          └──── ack / status ◀───┘
//! ```
//!
//! - **courier-core**: update model, filters, middleware, router
//! - **courier-transport**: the two acquisition loops and the HTTP source
//! - **courier-runtime**: configuration, logging, mode selection, shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Router::builder()
//!         .route(
//!             Route::on(UpdateKind::Message)
//!                 .filter(Command::new("start"))
//!                 .handler_fn(|cx| async move {
//!                     let chat = cx.update().chat().unwrap().id;
//!                     cx.api()
//!                         .call("sendMessage", serde_json::json!({
//!                             "chat_id": chat,
//!                             "text": "hello!",
//!                         }))
//!                         .await?;
//!                     Ok(())
//!                 }),
//!         )
//!         .build();
//!
//!     CourierRuntime::builder().router(router).build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `webhook` *(default)*: the axum-based push endpoint
//! - `http-source` *(default)*: the reqwest-based update source
//! - `toml-config` *(default)*: TOML configuration files
//! - `json-log`: newline-delimited JSON log output

pub use courier_core as core;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{ConfigLoader, CourierConfig, CourierRuntime};

    // Routing - the dispatch engine
    pub use courier_core::{
        Cx, MiddlewarePolicy, Route, Router,
        filter::{Command, Filter, all, any, chat_type, filter_fn, not},
        handler::{BoxedHandler, Handler, handler_fn},
        middleware::{Gate, Middleware, middleware_fn},
    };

    // Update model
    pub use courier_core::{Chat, ChatType, Update, UpdateKind, UpdatePayload};

    // Errors
    pub use courier_core::{BoxError, DispatchError, HandlerResult, SourceError};

    // Collaborator traits
    pub use courier_core::source::{Api, GetUpdates, UpdateSource, WebhookSpec};

    // Acquisition loops
    pub use courier_transport::{Poller, PollerConfig};

    #[cfg(feature = "webhook")]
    pub use courier_transport::{Webhook, WebhookConfig};

    #[cfg(feature = "http-source")]
    pub use courier_transport::HttpUpdateSource;
}
