//! Configuration types for Trellis rendering.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from
//! external sources; every field is optional and falls back to its default.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining engine and render settings.
//! - [`EngineConfig`] - Which layout engines are tried, how, and with how much memory.
//! - [`RenderConfig`] - Default output format and layout of render requests.
//!
//! # Example
//!
//! ```
//! # use trellis::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.engines().total_memory(), 16 * 1024 * 1024);
//! assert!(config.engines().order().is_empty());
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer, de};

use crate::{
    engine::{DEFAULT_TOTAL_MEMORY, ProbePolicy},
    options::{Format, Layout, RenderOptions},
};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Engine selection section.
    #[serde(default)]
    engines: EngineConfig,

    /// Render defaults section.
    #[serde(default)]
    render: RenderConfig,
}

impl AppConfig {
    pub fn new(engines: EngineConfig, render: RenderConfig) -> Self {
        Self { engines, render }
    }

    pub fn engines(&self) -> &EngineConfig {
        &self.engines
    }

    pub fn render(&self) -> &RenderConfig {
        &self.render
    }
}

/// Layout engine selection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine names in the order they are tried; empty means registry order.
    order: Vec<String>,

    /// When the last working engine is tried first.
    probe: ProbePolicy,

    /// Memory budget of each engine handle, in bytes.
    #[serde(deserialize_with = "positive_bytes")]
    total_memory: usize,

    /// Per-engine deadline in milliseconds; unset waits indefinitely.
    timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            probe: ProbePolicy::default(),
            total_memory: DEFAULT_TOTAL_MEMORY,
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn new(order: Vec<String>, probe: ProbePolicy, total_memory: usize) -> Self {
        Self {
            order,
            probe,
            total_memory,
            timeout_ms: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn probe(&self) -> ProbePolicy {
        self.probe
    }

    pub fn total_memory(&self) -> usize {
        self.total_memory
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn positive_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let bytes = usize::deserialize(deserializer)?;
    if bytes == 0 {
        return Err(de::Error::invalid_value(
            de::Unexpected::Unsigned(0),
            &"a memory budget greater than zero",
        ));
    }
    Ok(bytes)
}

/// Defaults applied to render requests.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    format: Format,

    #[serde(default)]
    layout: Layout,
}

impl RenderConfig {
    pub fn new(format: Format, layout: Layout) -> Self {
        Self { format, layout }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Render options carrying these defaults.
    pub fn options(&self) -> RenderOptions {
        RenderOptions::new()
            .with_format(self.format)
            .with_layout(self.layout)
    }
}
