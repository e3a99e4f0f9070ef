//! Service context.
//!
//! [`AppContext`] is constructed once at startup and shared across all route
//! handlers via Axum state. It only holds `Arc`s, so cloning it per request
//! is cheap, and everything behind it is read-only after construction.

use std::path::Path;
use std::sync::Arc;

use sc_av::{SilkConverter, ToolRegistry};
use sc_core::config::Config;

/// Application context shared by all request handlers (via Axum state).
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Tools resolved at startup.
    pub tools: Arc<ToolRegistry>,
    /// The conversion pipeline.
    pub converter: Arc<SilkConverter>,
}

impl AppContext {
    /// Discover tools and build the converter for `config`.
    pub fn new(config: Config) -> sc_core::Result<Self> {
        let tools = Arc::new(ToolRegistry::discover(&config.tools));
        Self::with_tools(config, tools)
    }

    /// Build a context around an already-resolved tool registry.
    pub fn with_tools(config: Config, tools: Arc<ToolRegistry>) -> sc_core::Result<Self> {
        let converter = Arc::new(SilkConverter::new(Arc::clone(&tools), &config)?);
        Ok(Self {
            config: Arc::new(config),
            tools,
            converter,
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.storage.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.storage.output_dir
    }
}
