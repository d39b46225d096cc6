//! # Courier Core
//!
//! The core dispatch engine of the Courier bot framework.
//!
//! Courier receives a stream of updates from a remote message platform,
//! either pulled by long polling or pushed over HTTP, and routes each one
//! to exactly one handler chosen by composable filters. This crate holds
//! everything that decides *which* handler runs; the acquisition loops
//! that decide *when* live in `courier-transport`.
//!
//! ## Building Blocks
//!
//! - **Update model** ([`update`]): the closed [`Update`]/[`UpdateKind`]
//!   envelope decoded once at the boundary
//! - **Filters** ([`filter`]): predicates gating route selection, with
//!   AND/OR/NOT composition
//! - **Middleware** ([`middleware`]): wrap pipeline composed around every
//!   handler under an explicit ordering policy
//! - **Router** ([`router`]): ordered route lists per kind, first match
//!   wins, fallback otherwise
//! - **Collaborators** ([`source`]): the opaque [`UpdateSource`] and
//!   [`Api`] capabilities the engine is wired to
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌──────────────────┐
//! │ Poller /     │────▶│   Router   │────▶│ middleware-wrapped │
//! │ Webhook      │     │ (filters)  │     │ handler            │
//! └──────────────┘     └────────────┘     └──────────────────┘
//!        ▲                    │
//!        └── ack / status ◀───┘  (result flows back unchanged)
//! ```
//!
//! The acquisition side owns the delivery contract: it decides, from the
//! dispatch result, whether to advance its cursor (poller) or which HTTP
//! status to answer (webhook).

pub mod context;
pub mod error;
pub mod filter;
pub mod handler;
pub mod middleware;
pub mod router;
pub mod source;
pub mod update;

pub use context::Cx;
pub use error::{
    BoxError, DispatchError, DispatchResult, FilterResult, HandlerResult, SourceError,
    SourceResult,
};
pub use filter::{
    All, Any, BoxedFilter, ChatTypeFilter, Command, Filter, FilterFn, Not, all, any, chat_type,
    filter_fn, not,
};
pub use handler::{BoxedHandler, Handler, HandlerFn, Noop, handler_fn};
pub use middleware::{
    BoxedMiddleware, Chain, Gate, Middleware, MiddlewareFn, MiddlewarePolicy, middleware_fn,
};
pub use router::{Route, RouteBuilder, Router, RouterBuilder};
pub use source::{Api, BoxedApi, BoxedSource, GetUpdates, UpdateSource, WebhookSpec};
pub use update::{
    Chat, ChatType, Message, Update, UpdateKind, UpdatePayload, User,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::context::Cx;
    pub use super::error::{BoxError, DispatchError, HandlerResult, SourceError};
    pub use super::filter::{Command, Filter, all, any, chat_type, filter_fn, not};
    pub use super::handler::{BoxedHandler, Handler, handler_fn};
    pub use super::middleware::{Middleware, MiddlewarePolicy};
    pub use super::router::{Route, Router};
    pub use super::source::{Api, GetUpdates, UpdateSource, WebhookSpec};
    pub use super::update::{Chat, ChatType, Update, UpdateKind, UpdatePayload};
}
