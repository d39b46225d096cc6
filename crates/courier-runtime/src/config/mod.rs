//! Configuration loading and schema.

mod loader;
mod schema;

pub use loader::{ConfigLoader, load_config};
pub use schema::{
    ApiConfig, BackoffSettings, CourierConfig, LogFormat, LogOutput, LoggingConfig,
    PollerSettings, WebhookSettings,
};
