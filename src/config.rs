//! Client configuration.
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags. Every field has a default except the session and user
//! ids, which identify the conversation and must be supplied one way or the
//! other.
//!
//! ```toml
//! server_url = "https://clinic.example.no"
//! session_id = "5f1c9c1e-0d7a-4d8e-9a57-1f6f1f1b2a10"
//! user_id = "42"
//! csrf_token = "..."
//! retry_interval_ms = 3000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Args;
use crate::connection::ConnectionConfig;
use crate::error::ChatError;
use crate::render::DEFAULT_SENDER_LABEL;
use crate::session::{http_endpoint, Session, UserId};
use crate::upload::ImageUploader;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfig {
    /// HTTP base URL of the chat server.
    pub server_url: String,
    pub session_id: Option<String>,
    pub user_id: Option<UserId>,
    /// Path of the upload endpoint, resolved against `server_url`.
    pub upload_path: String,
    pub csrf_token: Option<String>,
    pub retry_interval_ms: u64,
    pub banner_duration_ms: u64,
    /// Label shown above messages from the other participant.
    pub sender_label: String,
    pub request_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            session_id: None,
            user_id: None,
            upload_path: "/chat/upload/".to_string(),
            csrf_token: None,
            retry_interval_ms: 3_000,
            banner_duration_ms: 5_000,
            sender_label: DEFAULT_SENDER_LABEL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ChatConfig {
    /// Parse a TOML document. `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ChatError> {
        toml::from_str(text).map_err(|e| ChatError::ConfigParse {
            path: origin.to_string(),
            detail: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let text = std::fs::read_to_string(path).map_err(|e| ChatError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// Load the file named by `--config` (if any) and apply flag overrides.
    pub fn from_args(args: &Args) -> Result<Self, ChatError> {
        let mut cfg = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        cfg.apply_overrides(args);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(server) = &args.server {
            self.server_url = server.clone();
        }
        if let Some(session) = &args.session {
            self.session_id = Some(session.clone());
        }
        if let Some(user) = &args.user {
            self.user_id = Some(UserId::new(user.clone()));
        }
        if let Some(token) = &args.csrf_token {
            self.csrf_token = Some(token.clone());
        }
        if let Some(ms) = args.retry_ms {
            self.retry_interval_ms = ms;
        }
    }

    /// Check required fields and ranges.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.session_id.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ChatError::InvalidConfig("session_id is required".into()));
        }
        if self.user_id.as_ref().map_or(true, |u| u.as_str().trim().is_empty()) {
            return Err(ChatError::InvalidConfig("user_id is required".into()));
        }
        if self.retry_interval_ms == 0 {
            return Err(ChatError::InvalidConfig(
                "retry_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn session(&self) -> Result<Session, ChatError> {
        self.validate()?;
        let id = self.session_id.clone().unwrap_or_default();
        let user = self.user_id.clone().unwrap_or_else(|| UserId::new(""));
        Ok(Session::new(id, user))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn banner_duration(&self) -> Duration {
        Duration::from_millis(self.banner_duration_ms)
    }

    pub fn connection_config(&self, session: &Session) -> Result<ConnectionConfig, ChatError> {
        let url = session.socket_url(&self.server_url)?;
        Ok(ConnectionConfig::new(url).retry_interval(self.retry_interval()))
    }

    pub fn uploader(&self, session: &Session) -> Result<ImageUploader, ChatError> {
        let url = http_endpoint(&self.server_url, &self.upload_path)?;
        let uploader = ImageUploader::with_timeout(
            url,
            session.id(),
            Duration::from_secs(self.request_timeout_secs),
        );
        Ok(match &self.csrf_token {
            Some(token) => uploader.csrf_token(token.clone()),
            None => uploader,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn defaults_match_widget_constants() {
        let cfg = ChatConfig::default();
        assert_eq!(cfg.retry_interval(), Duration::from_secs(3));
        assert_eq!(cfg.banner_duration(), Duration::from_secs(5));
        assert_eq!(cfg.upload_path, "/chat/upload/");
    }

    #[test]
    fn parses_numeric_user_id() {
        let cfg = ChatConfig::from_toml_str("session_id = \"s1\"\nuser_id = 42\n", "inline").unwrap();
        assert_eq!(cfg.user_id, Some(UserId::from(42u64)));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = ChatConfig::from_toml_str("retry = 5\n", "inline").unwrap_err();
        assert!(matches!(err, ChatError::ConfigParse { .. }));
    }

    #[test]
    fn missing_session_fails_validation() {
        let cfg = ChatConfig {
            user_id: Some(UserId::new("1")),
            ..ChatConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("session_id"));
    }

    #[test]
    fn zero_retry_interval_fails_validation() {
        let cfg = ChatConfig {
            session_id: Some("s".into()),
            user_id: Some(UserId::new("1")),
            retry_interval_ms: 0,
            ..ChatConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server_url = \"http://file.example\"\nsession_id = \"from-file\"\nuser_id = \"7\"\nretry_interval_ms = 1000"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let args = Args::parse_from([
            "tolk-chat",
            "--config",
            path.as_str(),
            "--session",
            "from-flag",
            "--retry-ms",
            "250",
        ]);
        let cfg = ChatConfig::from_args(&args).unwrap();
        assert_eq!(cfg.server_url, "http://file.example");
        assert_eq!(cfg.session_id.as_deref(), Some("from-flag"));
        assert_eq!(cfg.user_id, Some(UserId::new("7")));
        assert_eq!(cfg.retry_interval_ms, 250);
    }

    #[test]
    fn missing_config_file_is_read_error() {
        let err = ChatConfig::load(Path::new("/no/such/tolk.toml")).unwrap_err();
        assert!(matches!(err, ChatError::ConfigRead { .. }));
    }

    #[test]
    fn connection_and_upload_endpoints() {
        let cfg = ChatConfig {
            server_url: "https://clinic.example.no".into(),
            session_id: Some("abc".into()),
            user_id: Some(UserId::new("1")),
            csrf_token: Some("t".into()),
            retry_interval_ms: 500,
            ..ChatConfig::default()
        };
        let session = cfg.session().unwrap();
        let conn = cfg.connection_config(&session).unwrap();
        assert_eq!(conn.url.as_str(), "wss://clinic.example.no/ws/chat/abc/");
        assert_eq!(conn.retry_interval, Duration::from_millis(500));
        let up = cfg.uploader(&session).unwrap();
        assert_eq!(up.url().as_str(), "https://clinic.example.no/chat/upload/");
    }
}
