//! Globeshot
//!
//! Serves rendered snapshots of a 3D globe scene over HTTP. A viewpoint
//! (latitude, longitude, altitude, heading, pitch, roll) arrives as a query
//! string, is handed to the scene page running inside a headless browser, and
//! the PNG the page captures is written back as the response body.
//!
//! # Layout
//!
//! - [`viewpoint`]: query parameter validation and defaulting
//! - [`bridge`]: builds the scene invocation and decodes its data URI result
//! - [`async_api`]: async handle over a worker thread that owns the browser
//! - [`server`]: the axum router (`GET /`) with permissive CORS headers
//! - `cdp`: headless Chrome backend (feature `cdp`, on by default)
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use globeshot::{bridge::RenderBridge, HostConfig, RenderHost};
//!
//! let config = HostConfig {
//!     scene_url: globeshot::resolve_scene_url("index.html")?,
//!     ..Default::default()
//! };
//! let host = RenderHost::launch(config.clone()).await?;
//! let bridge = RenderBridge::new(Arc::new(host.clone()), config.render_timeout());
//! let app = globeshot::server::router(bridge);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! host.close().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result, ValidationError};

pub mod async_api;
pub mod bridge;
pub mod server;
pub mod viewpoint;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use async_api::RenderHost;
pub use bridge::{RenderBridge, RenderContext, RenderResult};
pub use viewpoint::{validate, ViewpointRequest};

/// Configuration for the browser hosting the scene
///
/// The defaults match the window the scene was designed for (900x600) and
/// give both the initial page load and each render 30 seconds.
///
/// # Examples
///
/// ```
/// let cfg = globeshot::HostConfig::default();
/// assert_eq!(cfg.viewport.width, 900);
/// ```
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// URL of the page defining the render function (`file://` or `http://`)
    pub scene_url: String,
    /// Browser window dimensions
    pub viewport: Viewport,
    /// Run Chrome without a visible window
    pub headless: bool,
    /// Time allowed for the scene to load and define its render function
    pub load_timeout_ms: u64,
    /// Time allowed for a single render, including time spent queued
    pub render_timeout_ms: u64,
}

impl HostConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scene_url: "about:blank".to_string(),
            viewport: Viewport::default(),
            headless: true,
            load_timeout_ms: 30000,
            render_timeout_ms: 30000,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 900,
            height: 600,
        }
    }
}

/// Synchronous backend driving the page that hosts the scene
///
/// Implementations are created and used on a single worker thread (see
/// [`RenderHost`]), so they need not be `Send`.
pub trait Engine {
    /// Start the backend with the given configuration
    fn new(config: HostConfig) -> Result<Self>
    where
        Self: Sized;

    /// Navigate to the scene and wait until it can accept invocations
    fn load_scene(&mut self, url: &str) -> Result<()>;

    /// Evaluate `script` in the page, awaiting the promise it returns.
    ///
    /// Resolves to the promise's string value; a rejection maps to
    /// [`Error::Rejected`] with the stringified reason.
    fn evaluate_async(&mut self, script: &str) -> Result<String>;

    /// Close the backend and clean up resources
    fn close(self) -> Result<()>;
}

/// Turn a `--scene` argument into a URL the browser can load.
///
/// Anything containing `://` (or `about:`) is used verbatim; everything else
/// is treated as a local file that must exist.
pub fn resolve_scene_url(scene: &str) -> Result<String> {
    if scene.contains("://") || scene.starts_with("about:") {
        return Ok(scene.to_string());
    }

    let path = Path::new(scene)
        .canonicalize()
        .map_err(|e| Error::ConfigError(format!("scene file {}: {}", scene, e)))?;
    Ok(format!("file://{}", path.display()))
}
