//! Chrome DevTools Protocol backend hosting the globe scene

use crate::bridge::RENDER_FUNCTION;
use crate::{Engine, Error, HostConfig, Result};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

// headless_chrome drops the connection after this much inactivity; the
// service keeps one tab open for its whole lifetime.
const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Payload posted back by the evaluation wrapper.
#[derive(Debug, Deserialize)]
struct Outcome {
    result: Option<String>,
    error: Option<String>,
}

/// CDP-based engine (uses the `headless_chrome` crate)
///
/// Launches Chrome, opens a single tab on the scene page and evaluates
/// render invocations in that tab's global context.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    config: HostConfig,
}

impl CdpEngine {
    /// Poll until the scene defines its render function.
    fn wait_for_render_function(&self) -> Result<()> {
        let probe = format!("typeof {} === 'function'", RENDER_FUNCTION);
        let deadline = Instant::now() + self.config.load_timeout();

        loop {
            let ready = self
                .tab
                .evaluate(&probe, false)
                .map_err(|e| Error::LoadError(format!("Readiness probe failed: {}", e)))?
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            if ready {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::LoadError(format!(
                    "{} was not defined within {}ms",
                    RENDER_FUNCTION, self.config.load_timeout_ms
                )));
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }
    }
}

impl Engine for CdpEngine {
    fn new(config: HostConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(BROWSER_IDLE_TIMEOUT)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        // Bounds every CDP call, including awaiting the render promise
        tab.set_default_timeout(config.render_timeout().max(config.load_timeout()));

        info!(
            "Chrome started ({}x{}, headless: {})",
            config.viewport.width, config.viewport.height, config.headless
        );

        Ok(Self { browser, tab, config })
    }

    fn load_scene(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        self.wait_for_render_function()
    }

    fn evaluate_async(&mut self, script: &str) -> Result<String> {
        // The invocation travels base64-encoded so it never needs escaping; the
        // wrapper turns a rejection into a resolved `{error}` payload.
        let b64 = Base64Engine::encode(&base64::engine::general_purpose::STANDARD, script);
        let wrapper_template = r#"(async function(){
            try {
                const value = await (0, eval)(atob("{{B64_TOKEN}}"));
                return JSON.stringify({ result: String(value) });
            } catch (e) {
                return JSON.stringify({ error: String(e) });
            }
        })()"#;
        let wrapper = wrapper_template.replace("{{B64_TOKEN}}", &b64);

        let eval_res = self
            .tab
            .evaluate(&wrapper, true)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;

        let val = eval_res
            .value
            .ok_or_else(|| Error::ScriptError("No value returned from evaluation".into()))?;
        let raw = val
            .as_str()
            .ok_or_else(|| Error::ScriptError(format!("Unexpected evaluation result: {}", val)))?;

        let outcome: Outcome = serde_json::from_str(raw)
            .map_err(|e| Error::ScriptError(format!("Unreadable evaluation payload: {}", e)))?;

        match outcome {
            Outcome { error: Some(reason), .. } => Err(Error::Rejected(reason)),
            Outcome { result: Some(value), .. } => {
                debug!("Render resolved with {} chars", value.len());
                Ok(value)
            }
            Outcome { .. } => Err(Error::ScriptError("Evaluation payload was empty".into())),
        }
    }

    fn close(self) -> Result<()> {
        // Drop the tab before the browser so the child process exits promptly
        drop(self.tab);
        drop(self.browser);
        info!("Chrome closed");
        Ok(())
    }
}
