//! Spring host
//!
//! Runs the in-process host with the `input_boolean` component and the
//! spring reactor, configured from one YAML file:
//!
//! ```yaml
//! input_boolean:
//!   doorbell_chime:
//!     name: Doorbell chime
//!
//! spring_input_booleans:
//!   delay_seconds: 5
//! ```

use anyhow::{Context as _, Result};
use ha_components::{load_input_booleans, register_input_boolean_services, InputBooleanConfig};
use serde::Deserialize;
use spring_input_booleans::{setup_entry, LocalHost, SpringConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "configuration.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostConfig {
    input_boolean: HashMap<String, Option<InputBooleanConfig>>,
    spring_input_booleans: SpringConfig,
}

impl HostConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Option<Self> = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config.unwrap_or_default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = HostConfig::load(&path)?;

    info!("Starting spring host with {}", path.display());

    let host = Arc::new(LocalHost::new());
    register_input_boolean_services(&host.services, host.states.clone());
    load_input_booleans(&config.input_boolean, &host.states);

    let reactor = setup_entry(host.clone(), config.spring_input_booleans).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    reactor.stop().await;
    host.bus.close();

    Ok(())
}
