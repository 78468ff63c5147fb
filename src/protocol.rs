//! Wire types for the chat socket and the upload endpoint.
//!
//! Inbound frames are either chat records (`type` absent or `"chat_message"`)
//! or out-of-band error alerts (`type: "error_alert"`). The only outbound frame
//! is `{"message": "..."}`; ids and timestamps are assigned by the server.

use serde::{Deserialize, Deserializer, Serialize};

use crate::session::UserId;

/// Frame `type` tag for out-of-band error alerts.
pub const ERROR_ALERT_TYPE: &str = "error_alert";

/// One chat message record as broadcast by the server.
///
/// The same `id` may arrive several times: first with the original text, later
/// with the translation filled in. Empty strings and `null` are treated as
/// absent for every optional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub sender_id: UserId,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub text_original: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub text_translated: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A chat record to reconcile into the transcript.
    Message(MessageRecord),
    /// An application-level error meant for the banner.
    ErrorAlert { error: String },
}

/// Peek at the `type` tag without committing to a shape.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    frame_type: Option<String>,
}

#[derive(Deserialize)]
struct AlertBody {
    #[serde(default)]
    error: Option<String>,
}

/// Decode one text frame from the socket.
///
/// # Errors
/// Returns the underlying `serde_json` error when the text is not JSON, or
/// when a chat record lacks `id` / `sender_id`.
pub fn decode_frame(text: &str) -> Result<InboundFrame, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let envelope = Envelope::deserialize(&value)?;
    if envelope.frame_type.as_deref() == Some(ERROR_ALERT_TYPE) {
        let body = AlertBody::deserialize(&value)?;
        return Ok(InboundFrame::ErrorAlert {
            error: body.error.unwrap_or_default(),
        });
    }
    MessageRecord::deserialize(value).map(InboundFrame::Message)
}

/// The client-to-server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub message: String,
}

impl OutboundFrame {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// JSON body returned by the upload endpoint.
///
/// Any field other than `error` is ignored; a successful upload is announced
/// separately through the socket as a chat record carrying `image_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    #[serde(default, deserialize_with = "non_empty")]
    pub error: Option<String>,
}

fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}
