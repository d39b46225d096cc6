//! # Courier Transport
//!
//! Update acquisition loops for the Courier bot framework.
//!
//! This crate owns the two ways updates enter the system, both feeding the
//! read-only `courier_core::Router` and sharing its delivery contract:
//!
//! | component | mode | acknowledgement |
//! |-----------|------|-----------------|
//! | [`Poller`] | pull (long poll) | cursor advance after the batch is handed over |
//! | [`Webhook`] | push (HTTP) | response status per request |
//!
//! ## Features
//!
//! - `webhook`: the axum-based push endpoint
//! - `http-source`: the reqwest-based [`HttpUpdateSource`]
//! - `full`: both
//!
//! The poller itself is always available; it only needs an
//! `UpdateSource` implementation, which tests and embedded hosts may
//! provide themselves.

pub mod poller;

#[cfg(feature = "webhook")]
pub mod webhook;

#[cfg(feature = "http-source")]
pub mod http;

pub use poller::{BackoffConfig, Poller, PollerConfig};

#[cfg(feature = "webhook")]
pub use webhook::{SECRET_TOKEN_HEADER, Webhook, WebhookConfig};

#[cfg(feature = "http-source")]
pub use http::HttpUpdateSource;
