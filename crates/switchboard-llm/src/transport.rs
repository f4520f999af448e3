//! Shared HTTP plumbing for the vendor adapters.
//!
//! Adapters build a [`reqwest::RequestBuilder`] with their own payload and
//! credential placement, then hand it to these helpers for status handling
//! and stream driving.

use std::sync::LazyLock;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::decode::WireFormat;
use crate::error::{ProviderError, Result};
use crate::sink::StreamSink;
use crate::stream::drive;

static HTTP_CLIENT: LazyLock<std::result::Result<reqwest::Client, String>> = LazyLock::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("switchboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| crate::error::error_chain(&e))
});

/// The HTTP client shared by every provider.
///
/// Built on first use. A client that cannot be built (no usable TLS
/// backend) fails each request with [`ProviderError::Config`].
pub fn http_client() -> Result<reqwest::Client> {
    HTTP_CLIENT.as_ref().cloned().map_err(|detail| {
        warn!(error = %detail, "failed to build HTTP client");
        ProviderError::Config(format!("failed to build HTTP client: {detail}"))
    })
}

/// Apply the provider's extra headers.
pub fn apply_headers(mut req: RequestBuilder, config: &ProviderConfig) -> RequestBuilder {
    for (name, value) in &config.headers {
        req = req.header(name.as_str(), value.as_str());
    }
    req
}

/// Apply the extra headers and the per-provider timeout as a deadline for
/// the whole exchange. Only for requests whose body is read in one go.
pub fn apply_config(req: RequestBuilder, config: &ProviderConfig) -> RequestBuilder {
    apply_headers(req, config).timeout(config.timeout())
}

/// Send a request, turning any non-2xx status into
/// [`ProviderError::HttpStatus`] carrying the response body.
pub async fn send(req: RequestBuilder) -> Result<Response> {
    let response = req.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %body, "provider returned error status");
    Err(ProviderError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

/// Send a request and parse the success body as JSON.
pub async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let response = send(req).await?;
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {e}")))
}

/// Send a streaming request and drive its body into `sink`.
///
/// `timeout` bounds the wait for the response head and, separately, every
/// gap between body chunks. A stream that keeps producing data is never cut
/// off, however long it runs.
///
/// Every outcome, including a failure to connect, reaches the sink as
/// exactly one terminal callback.
pub async fn stream_response(
    req: RequestBuilder,
    format: WireFormat,
    timeout: Duration,
    sink: &mut dyn StreamSink,
    cancel: &CancellationToken,
) {
    if cancel.is_cancelled() {
        sink.on_error(ProviderError::Cancelled);
        return;
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            sink.on_error(ProviderError::Cancelled);
            return;
        }
        result = tokio::time::timeout(timeout, send(req)) => match result {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "no response within {}s",
                timeout.as_secs_f64()
            ))),
        },
    };

    match response {
        Ok(response) => {
            let body = idle_timeout(response.bytes_stream(), timeout);
            drive(body, format, sink, cancel).await;
        }
        Err(err) => sink.on_error(err),
    }
}

/// Fail a body stream with [`ProviderError::Timeout`] once no chunk has
/// arrived for `idle`.
pub(crate) fn idle_timeout<S, T, E>(
    body: S,
    idle: Duration,
) -> impl Stream<Item = Result<T>>
where
    S: Stream<Item = std::result::Result<T, E>>,
    E: Into<ProviderError>,
{
    futures_util::stream::unfold(Box::pin(body), move |mut body| async move {
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(item)) => Some((item.map_err(Into::into), body)),
            Ok(None) => None,
            Err(_) => Some((
                Err(ProviderError::Timeout(format!(
                    "no data received for {}s",
                    idle.as_secs_f64()
                ))),
                body,
            )),
        }
    })
}
