//! Crate-level error type.
//!
//! Every fallible operation in the library returns [`ChatError`]. Channel-level
//! failures (dial errors, dropped sockets) are normally absorbed by the
//! reconnect loop and only show up here when a caller asks for them directly.

use thiserror::Error;

/// Errors produced by the chat client.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`ChatConfig`](crate::config::ChatConfig).
    #[error("invalid config file {path}: {detail}")]
    ConfigParse { path: String, detail: String },

    /// A required setting is missing or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The server URL could not be parsed or has an unsupported scheme.
    #[error("invalid server url '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    /// The socket handshake failed.
    #[error("socket connect to {url} failed: {detail}")]
    Dial { url: String, detail: String },

    /// `send` was called while the channel is not open.
    #[error("not connected; message was not sent")]
    NotConnected,

    /// `send` was called with an empty or whitespace-only message.
    #[error("refusing to send a blank message")]
    BlankMessage,

    /// The connection driver has been disposed or has exited.
    #[error("connection driver is no longer running")]
    DriverClosed,

    /// An outbound frame could not be serialized.
    #[error("failed to encode outbound frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The image file could not be read from disk.
    #[error("cannot read image {path}: {source}")]
    ImageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A second upload was started while one is still running.
    #[error("an upload is already in progress")]
    UploadInFlight,

    /// The upload request did not reach the server.
    #[error("upload to {url} failed: {detail}")]
    UploadTransport { url: String, detail: String },

    /// The upload endpoint answered with a body that is not the expected JSON.
    #[error("upload response from {url} could not be decoded: {detail}")]
    UploadDecode { url: String, detail: String },
}
