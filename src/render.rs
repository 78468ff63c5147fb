//! Display content for one chat record.
//!
//! [`compose`] turns a [`MessageRecord`] into a [`RenderedMessage`] from the
//! viewer's point of view. The result is independent of any output device:
//! the terminal surface paints it with colors, [`RenderedMessage::to_html`]
//! produces the markup the web widget uses.

use crate::protocol::MessageRecord;
use crate::session::UserId;

/// Default label shown above messages from the other participant.
pub const DEFAULT_SENDER_LABEL: &str = "Nurse 👩‍⚕️";

/// Prefix of every element key; the full key is `msg-<id>`.
pub const KEY_PREFIX: &str = "msg-";

/// Which side of the conversation a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageClass {
    Sent,
    Received,
}

impl MessageClass {
    pub fn css_class(self) -> &'static str {
        match self {
            MessageClass::Sent => "sent",
            MessageClass::Received => "received",
        }
    }
}

impl std::fmt::Display for MessageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.css_class())
    }
}

/// What the message bubble shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Thumbnail linking to the full image.
    Image { url: String },
    /// Display text as received. Markup output escapes it.
    Text(String),
    /// Recipient view while the translation has not arrived yet.
    Translating,
    /// Sender view of a record without any original text.
    Empty,
}

/// Everything needed to paint one message element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub key: String,
    pub class: MessageClass,
    pub sender_label: Option<String>,
    pub body: MessageBody,
    pub timestamp: String,
}

/// Element key for a message id.
pub fn element_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Neutralize markup in displayed text.
///
/// Only `<` and `>` are replaced; this is not a general sanitizer.
pub fn escape_text(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// Escape a value placed inside a double-quoted attribute.
fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Build the display content of `record` for `viewer`.
///
/// Image records ignore every text field. For text records the sender sees
/// `text_original`; the recipient sees `text_translated`, falling back to
/// `text_original`, falling back to the translating placeholder.
pub fn compose(record: &MessageRecord, viewer: &UserId, sender_label: &str) -> RenderedMessage {
    let is_own = &record.sender_id == viewer;
    let class = if is_own {
        MessageClass::Sent
    } else {
        MessageClass::Received
    };

    let body = if let Some(url) = &record.image_url {
        MessageBody::Image { url: url.clone() }
    } else if is_own {
        match &record.text_original {
            Some(text) => MessageBody::Text(text.clone()),
            None => MessageBody::Empty,
        }
    } else {
        match record
            .text_translated
            .as_deref()
            .or(record.text_original.as_deref())
        {
            Some(text) => MessageBody::Text(text.to_string()),
            None => MessageBody::Translating,
        }
    };

    RenderedMessage {
        key: element_key(&record.id),
        class,
        sender_label: (!is_own).then(|| sender_label.to_string()),
        body,
        timestamp: record.timestamp.clone(),
    }
}

impl MessageBody {
    /// Plain-text rendition used by line-oriented outputs. Text is shown
    /// unescaped; terminals do not interpret markup.
    pub fn plain(&self) -> String {
        match self {
            MessageBody::Image { url } => format!("[image] {url}"),
            MessageBody::Text(text) => text.clone(),
            MessageBody::Translating => "... typing / oversetter ...".to_string(),
            MessageBody::Empty => String::new(),
        }
    }

    /// Body markup. Text passes through [`escape_text`].
    pub fn to_html(&self) -> String {
        match self {
            MessageBody::Image { url } => {
                let url = escape_attr(url);
                format!(
                    r#"<a href="{url}" target="_blank"><img src="{url}" class="chat-image"></a>"#
                )
            }
            MessageBody::Text(text) => escape_text(text),
            MessageBody::Translating => {
                r#"<i style="color:#888; font-size:0.8em;">... typing / oversetter ...</i>"#
                    .to_string()
            }
            MessageBody::Empty => String::new(),
        }
    }
}

impl RenderedMessage {
    /// Inner markup of the message element: label, body, time.
    pub fn to_html(&self) -> String {
        let label = self
            .sender_label
            .as_deref()
            .map(|l| format!(r#"<span class="sender-label">{}</span>"#, escape_text(l)))
            .unwrap_or_default();
        format!(
            r#"{label}{}<span class="time">{}</span>"#,
            self.body.to_html(),
            escape_text(&self.timestamp)
        )
    }

    /// Full element markup, as appended to the message log.
    pub fn to_element_html(&self) -> String {
        format!(
            r#"<div id="{}" class="message {}">{}</div>"#,
            escape_attr(&self.key),
            self.class.css_class(),
            self.to_html()
        )
    }
}
