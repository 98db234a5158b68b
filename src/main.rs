use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use globeshot::{HostConfig, RenderBridge, RenderHost, Viewport};
use log::{error, info};

/// Serve snapshots of a globe scene hosted in headless Chrome.
#[derive(Parser, Debug)]
#[command(name = "globeshot", version, about)]
struct Cli {
    /// Interface to listen on
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Scene page defining getImg(): a local path or a URL
    #[arg(long, default_value = "index.html")]
    scene: String,

    /// Browser window width
    #[arg(long, default_value_t = 900)]
    width: u32,

    /// Browser window height
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Milliseconds allowed per render, including time queued behind other renders
    #[arg(long, default_value_t = 30000)]
    render_timeout_ms: u64,

    /// Milliseconds allowed for the scene to load
    #[arg(long, default_value_t = 30000)]
    load_timeout_ms: u64,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,
}

impl Cli {
    fn host_config(&self) -> globeshot::Result<HostConfig> {
        Ok(HostConfig {
            scene_url: globeshot::resolve_scene_url(&self.scene)?,
            viewport: Viewport { width: self.width, height: self.height },
            headless: !self.headed,
            load_timeout_ms: self.load_timeout_ms,
            render_timeout_ms: self.render_timeout_ms,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.host_config()?;

    // Without a loaded scene nothing can be served; refuse to start.
    let host = RenderHost::launch(config.clone()).await.map_err(|e| {
        error!("Failed to start render host: {}", e);
        e
    })?;

    let bridge = RenderBridge::new(Arc::new(host.clone()), config.render_timeout());
    let app = globeshot::server::router(bridge);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Globe snapshot service listening at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(globeshot::server::shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    host.close().await?;
    Ok(())
}
