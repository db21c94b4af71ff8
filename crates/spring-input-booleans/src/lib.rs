//! Spring-loaded input booleans
//!
//! Every externally caused `on`/`off` transition of a watched toggle entity
//! is undone by commanding the opposite state, optionally after a delay.
//! Turning an entity off can send an actionable phone notification whose
//! buttons pick the delay for the next reversal.
//!
//! ```no_run
//! use spring_input_booleans::{setup_entry, LocalHost, SpringConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), spring_input_booleans::SpringError> {
//! let host = Arc::new(LocalHost::new());
//! let reactor = setup_entry(host, SpringConfig::default()).await?;
//! // ...
//! reactor.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod decision;
pub mod error;
pub mod host;
pub mod notify;
pub mod reactor;
pub mod toggle;

pub use actions::{ActionRequest, SpringAction, IOS_ACTION_EVENT, MOBILE_APP_ACTION_EVENT};
pub use config::SpringConfig;
pub use decision::{decide, Decision, IgnoreReason, Reversal};
pub use error::{ConfigError, HostError, SpringError};
pub use host::{EventSource, Host, LocalHost, ServiceCaller, StateReader};
pub use reactor::{Reaction, SpringReactor};
pub use toggle::ToggleState;

use std::sync::Arc;
use tracing::instrument;

/// Validate the configuration and start a reactor on `host`
///
/// Unloading is [`SpringReactor::stop`].
#[instrument(skip_all, fields(domain = %config.domain))]
pub async fn setup_entry<H: Host>(
    host: Arc<H>,
    config: SpringConfig,
) -> Result<SpringReactor<H>, SpringError> {
    config.validate()?;
    let reactor = SpringReactor::new(host, config);
    reactor.start().await?;
    Ok(reactor)
}
