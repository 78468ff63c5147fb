//! Chat session identity and endpoint derivation.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ChatError;

/// A participant id as the server emits it.
///
/// The server sends database ids as JSON numbers, but string ids are accepted
/// too. Any JSON number is taken in its textual form. Two ids are equal when their textual forms are equal, so `7` and `"7"`
/// name the same user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for UserId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => UserId(n.to_string()),
            Raw::Text(s) => UserId(s),
        })
    }
}

/// One chat conversation as seen by the local participant.
///
/// Established once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    user_id: UserId,
}

impl Session {
    pub fn new(id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
        }
    }

    /// The opaque session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The viewer, i.e. the participant running this client.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Derive the socket endpoint for this session from the HTTP base URL.
    ///
    /// `https` maps to `wss`, `http` to `ws`; `ws`/`wss` bases are taken as-is.
    /// The path is always `/ws/chat/<session_id>/`, regardless of any path on
    /// the base.
    ///
    /// # Errors
    /// [`ChatError::InvalidUrl`] when the base does not parse or uses another
    /// scheme.
    pub fn socket_url(&self, server_url: &str) -> Result<Url, ChatError> {
        let mut url = parse_base(server_url)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(ChatError::InvalidUrl {
                    url: server_url.to_string(),
                    detail: format!("unsupported scheme '{other}'"),
                })
            }
        };
        url.set_scheme(scheme).map_err(|()| ChatError::InvalidUrl {
            url: server_url.to_string(),
            detail: format!("cannot switch scheme to {scheme}"),
        })?;
        url.set_path(&format!("/ws/chat/{}/", self.id));
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

/// Resolve `path` (e.g. `/chat/upload/`) against the HTTP base URL.
pub fn http_endpoint(server_url: &str, path: &str) -> Result<Url, ChatError> {
    let base = parse_base(server_url)?;
    match base.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ChatError::InvalidUrl {
                url: server_url.to_string(),
                detail: format!("upload endpoint needs http(s), got '{other}'"),
            })
        }
    }
    base.join(path).map_err(|e| ChatError::InvalidUrl {
        url: format!("{server_url} + {path}"),
        detail: e.to_string(),
    })
}

fn parse_base(server_url: &str) -> Result<Url, ChatError> {
    Url::parse(server_url).map_err(|e| ChatError::InvalidUrl {
        url: server_url.to_string(),
        detail: e.to_string(),
    })
}
