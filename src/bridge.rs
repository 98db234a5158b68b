//! Render bridge: turns a validated viewpoint into a scene invocation, awaits
//! the hosted render context, and decodes the returned data URI.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as Base64Engine;
use futures::future::BoxFuture;
use log::{debug, warn};

use crate::viewpoint::ViewpointRequest;
use crate::{Error, Result};

/// Name of the render-and-capture function the scene page must define.
pub const RENDER_FUNCTION: &str = "getImg";

/// Media type reported for every successful capture.
pub const PNG_MIME: &str = "image/png";

/// Asynchronous capability exposed by the page hosting the globe.
///
/// `execute` evaluates one invocation and resolves with the string the
/// scene's promise resolved to, or `Error::Rejected` carrying the rejection
/// reason. Implementations are shared across all in-flight requests.
pub trait RenderContext: Send + Sync {
    fn execute(&self, invocation: String) -> BoxFuture<'static, Result<String>>;
}

/// Outcome of one render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    Success { image_bytes: Vec<u8>, mime_type: String },
    Failure { message: String },
}

impl RenderResult {
    fn failure(err: &Error) -> Self {
        RenderResult::Failure {
            message: err.to_string(),
        }
    }
}

/// Bridges viewpoint requests onto a shared [`RenderContext`].
///
/// Cloning is cheap; every clone talks to the same context.
#[derive(Clone)]
pub struct RenderBridge {
    context: Arc<dyn RenderContext>,
    timeout: Duration,
}

impl RenderBridge {
    pub fn new(context: Arc<dyn RenderContext>, timeout: Duration) -> Self {
        Self { context, timeout }
    }

    /// Render a single viewpoint. Never retries.
    pub async fn render(&self, request: &ViewpointRequest) -> RenderResult {
        let invocation = build_invocation(request);
        debug!("Submitting render invocation: {}", invocation);

        let pending = self.context.execute(invocation);
        let resolved = match tokio::time::timeout(self.timeout, pending).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                warn!("Render context rejected invocation: {}", err);
                return RenderResult::failure(&err);
            }
            Err(_) => {
                let err = Error::Timeout(self.timeout.as_millis() as u64);
                warn!("Render did not complete: {}", err);
                return RenderResult::failure(&err);
            }
        };

        match decode_data_uri(&resolved) {
            Ok(image_bytes) => RenderResult::Success {
                image_bytes,
                mime_type: PNG_MIME.to_string(),
            },
            Err(err) => {
                warn!("Render context returned an undecodable value ({} chars)", resolved.len());
                RenderResult::failure(&err)
            }
        }
    }
}

/// Build `getImg(lat,lon,alt,hdg,pit,rol);` from the six viewpoint fields.
///
/// Values use the shortest decimal form that round-trips (`5000`, `-1`, `0.5`).
pub fn build_invocation(request: &ViewpointRequest) -> String {
    let mut script = String::with_capacity(64);
    script.push_str(RENDER_FUNCTION);
    script.push('(');
    for (i, value) in request.as_array().iter().enumerate() {
        if i > 0 {
            script.push(',');
        }
        // writing into a String cannot fail
        let _ = write!(script, "{}", value);
    }
    script.push_str(");");
    script
}

/// Decode the base64 payload that follows the first comma of a data URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (_, payload) = uri.split_once(',').ok_or(Error::MalformedResult)?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| Error::MalformedResult)
}
