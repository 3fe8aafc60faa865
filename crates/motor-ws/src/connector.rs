//! Transport seam for the push channel.

use crate::error::{WsError, WsResult};
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Stream of text frames from one established session.
///
/// Ends (or yields an error) when the session drops.
pub type PushStream = BoxStream<'static, WsResult<String>>;

/// Opens push-channel sessions.
pub trait PushConnector: Send + Sync + 'static {
    /// Perform the handshake. No timeout beyond what the transport enforces.
    fn connect(&self) -> BoxFuture<'_, WsResult<PushStream>>;
}

/// WebSocket connector over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PushConnector for WsConnector {
    fn connect(&self) -> BoxFuture<'_, WsResult<PushStream>> {
        Box::pin(async move {
            info!(url = %self.url, "Connecting to push channel");
            let (ws_stream, _response) = connect_async(self.url.as_str()).await?;

            let frames = ws_stream.filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (f.code.into(), f.reason.to_string()))
                            .unwrap_or((1000, "Normal close".to_string()));
                        warn!(code, %reason, "Push channel closed by server");
                        Some(Err(WsError::ConnectionClosed { code, reason }))
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                        debug!("Control frame received");
                        None
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(e.into())),
                }
            });
            Ok(frames.boxed())
        })
    }
}
