//! Transient error banner.
//!
//! Shows application-level errors (server `error_alert` frames, upload
//! failures) for a fixed duration and then hides them. Showing a new message
//! restarts the countdown, so an earlier deadline never hides a newer message.

use std::time::Duration;

use tokio::time::Instant;

/// Default time a banner stays visible.
pub const DEFAULT_BANNER_DURATION: Duration = Duration::from_secs(5);

/// Warning marker prepended to every banner text.
pub const BANNER_PREFIX: &str = "⚠️ ";

#[derive(Debug, Clone)]
pub struct ErrorBanner {
    duration: Duration,
    text: Option<String>,
    hide_at: Option<Instant>,
}

impl Default for ErrorBanner {
    fn default() -> Self {
        Self::new(DEFAULT_BANNER_DURATION)
    }
}

impl ErrorBanner {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            text: None,
            hide_at: None,
        }
    }

    /// Display `message` until `now + duration`. Returns the banner text.
    pub fn show(&mut self, message: &str, now: Instant) -> &str {
        self.hide_at = Some(now + self.duration);
        self.text.insert(format!("{BANNER_PREFIX}{message}"))
    }

    /// Hide immediately.
    pub fn hide(&mut self) {
        self.text = None;
        self.hide_at = None;
    }

    /// Hide the banner if its deadline has passed. Returns `true` when this
    /// call hid it.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if now >= deadline => {
                self.hide();
                true
            }
            _ => false,
        }
    }

    /// Text currently on display, if any.
    pub fn visible(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.text.is_some()
    }

    /// When the banner will auto-hide, if it is showing.
    pub fn deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_prefixes_warning_sign() {
        let mut b = ErrorBanner::default();
        let now = Instant::now();
        assert_eq!(b.show("File too large", now), "⚠️ File too large");
        assert!(b.is_visible());
        assert_eq!(b.deadline(), Some(now + DEFAULT_BANNER_DURATION));
    }

    #[test]
    fn expires_after_duration() {
        let mut b = ErrorBanner::new(Duration::from_secs(5));
        let now = Instant::now();
        b.show("x", now);
        assert!(!b.expire(now + Duration::from_secs(4)));
        assert!(b.is_visible());
        assert!(b.expire(now + Duration::from_secs(5)));
        assert!(!b.is_visible());
        assert!(b.deadline().is_none());
    }

    #[test]
    fn newer_message_restarts_countdown() {
        let mut b = ErrorBanner::new(Duration::from_secs(5));
        let t0 = Instant::now();
        b.show("first", t0);
        b.show("second", t0 + Duration::from_secs(3));
        assert!(!b.expire(t0 + Duration::from_secs(5)));
        assert_eq!(b.visible(), Some("⚠️ second"));
        assert!(b.expire(t0 + Duration::from_secs(8)));
    }

    #[test]
    fn hide_is_immediate() {
        let mut b = ErrorBanner::default();
        b.show("x", Instant::now());
        b.hide();
        assert!(b.visible().is_none());
    }

    #[test]
    fn expire_on_hidden_banner_is_noop() {
        let mut b = ErrorBanner::default();
        assert!(!b.expire(Instant::now()));
    }
}
