use crate::bridge::RenderContext;
use crate::{Engine, Error, HostConfig, Result};
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Render(String, oneshot::Sender<Result<String>>),
    Close(oneshot::Sender<Result<()>>),
}

/// Async handle to the page hosting the scene, backed by a dedicated worker thread.
///
/// The worker thread owns the [`Engine`] and runs render invocations one at
/// a time, in the order they were submitted. Invocations whose caller gave
/// up while they were queued are skipped. Callers suspend on a oneshot
/// channel while their invocation waits its turn, so the async runtime keeps
/// serving other requests. Clones share the same worker.
#[derive(Clone)]
pub struct RenderHost {
    cmd_tx: Sender<Command>,
}

impl RenderHost {
    /// Launch headless Chrome on the worker thread and load the configured scene.
    #[cfg(feature = "cdp")]
    pub async fn launch(config: HostConfig) -> Result<Self> {
        Self::start::<crate::cdp::CdpEngine>(config).await
    }

    /// Spawn the worker thread, create `E` on it and load the scene.
    ///
    /// Returns only once the scene is loaded, or with the error that
    /// prevented it; a host that failed to start never accepts invocations.
    pub async fn start<E: Engine + 'static>(config: HostConfig) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::Builder::new()
            .name("render-host".into())
            .spawn(move || {
                let scene_url = config.scene_url.clone();
                let mut engine = match E::new(config) {
                    Ok(e) => e,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };

                if let Err(err) = engine.load_scene(&scene_url) {
                    let _ = engine.close();
                    let _ = init_tx.send(Err(err));
                    return;
                }

                info!("Scene loaded: {}", scene_url);
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::Render(script, resp) => {
                            // caller timed out while this invocation was queued
                            if resp.is_closed() {
                                debug!("Skipping abandoned invocation {}", script);
                                continue;
                            }
                            debug!("Evaluating {}", script);
                            let res = engine.evaluate_async(&script);
                            // the caller may have timed out and dropped its receiver
                            if resp.send(res).is_err() {
                                debug!("Render result discarded; caller no longer waiting");
                            }
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(engine.close());
                            return;
                        }
                    }
                }

                // every handle dropped without an explicit close
                if let Err(err) = engine.close() {
                    warn!("Failed to close engine: {}", err);
                }
            })
            .map_err(|e| Error::InitializationError(format!("Failed to spawn render worker: {}", e)))?;

        let init_res = init_rx
            .await
            .map_err(|e| Error::InitializationError(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Submit one invocation and wait for the scene's answer.
    pub async fn render(&self, script: &str) -> Result<String> {
        self.execute(script.to_string()).await
    }

    /// Shut down the worker and close the browser.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| Error::Other("Render host already closed".into()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

impl RenderContext for RenderHost {
    fn execute(&self, invocation: String) -> BoxFuture<'static, Result<String>> {
        let (tx, rx) = oneshot::channel();
        let sent = self.cmd_tx.send(Command::Render(invocation, tx)).is_ok();
        async move {
            if !sent {
                return Err(Error::Other("Render host is not running".into()));
            }
            rx.await
                .map_err(|e| Error::Other(format!("Render canceled: {}", e)))?
        }
        .boxed()
    }
}
