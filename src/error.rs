use thiserror::Error;

/// Everything that can go wrong between this client and the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("chat connection is closed")]
    ConnectionClosed,
    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected request ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("malformed server payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}
