//! # Courier Runtime
//!
//! Runtime orchestration layer for the Courier bot framework.
//!
//! This crate wires a `courier_core::Router` to the acquisition loops in
//! `courier-transport` and owns the ambient concerns around them:
//!
//! - **Configuration** ([`config`]): figment-layered TOML + environment
//!   schema with documented defaults
//! - **Logging** ([`logging`]): tracing-subscriber setup driven by the
//!   configuration
//! - **Orchestration** ([`runtime`]): poll-vs-webhook mode selection and
//!   signal-driven graceful shutdown
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files
//! - `json-log`: newline-delimited JSON log output
//! - `webhook` / `http-source`: passed through to `courier-transport`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::builder()
//!     .router(router)
//!     .build()?;
//! runtime.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigLoader, CourierConfig, load_config};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use runtime::{CourierRuntime, RuntimeBuilder};
