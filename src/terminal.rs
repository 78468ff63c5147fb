//! Line-oriented terminal view.
//!
//! Terminals cannot rewrite an earlier line cheaply, so an in-place update is
//! printed as a new line marked `↻` that carries the element's original
//! position. The latest content of every element is also kept in memory and
//! can be inspected through [`TerminalView::entries`].

use std::io::Write;

use colored::*;

use crate::connection::ConnectionState;
use crate::reconciler::MessageSurface;
use crate::render::{MessageBody, MessageClass, RenderedMessage};
use crate::widget::ChatView;

pub struct TerminalView<W: Write> {
    out: W,
    entries: Vec<RenderedMessage>,
    status: Option<ConnectionState>,
    banner: Option<String>,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            entries: Vec::new(),
            status: None,
            banner: None,
        }
    }

    /// Current content of every element, in creation order.
    pub fn entries(&self) -> &[RenderedMessage] {
        &self.entries
    }

    pub fn status(&self) -> Option<ConnectionState> {
        self.status
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&self, message: &RenderedMessage, position: usize, updated: bool) -> String {
        let marker = if updated { "↻" } else { " " };
        let label = message
            .sender_label
            .as_deref()
            .map(|l| format!("{} ", l.bold()))
            .unwrap_or_default();
        let body = match &message.body {
            MessageBody::Translating => message.body.plain().dimmed().italic().to_string(),
            MessageBody::Image { .. } => message.body.plain().underline().to_string(),
            _ => message.body.plain(),
        };
        let body = match message.class {
            MessageClass::Sent => body.cyan().to_string(),
            MessageClass::Received => body,
        };
        format!(
            "{marker}#{position:<4} {} {label}{body}",
            format!("[{}]", message.timestamp).dimmed()
        )
    }

    fn emit(&mut self, text: String) {
        // A broken stdout must not take the client down.
        let _ = writeln!(self.out, "{text}");
    }
}

impl<W: Write> MessageSurface for TerminalView<W> {
    type Handle = usize;

    fn append(&mut self, message: &RenderedMessage) -> usize {
        let position = self.entries.len();
        let text = self.line(message, position, false);
        self.entries.push(message.clone());
        self.emit(text);
        position
    }

    fn replace(&mut self, handle: &usize, message: &RenderedMessage) {
        let Some(slot) = self.entries.get_mut(*handle) else {
            return;
        };
        // The element keeps the class it was created with.
        let class = slot.class;
        *slot = RenderedMessage {
            class,
            ..message.clone()
        };
        let updated = slot.clone();
        let text = self.line(&updated, *handle, true);
        self.emit(text);
    }

    fn scroll_to_latest(&mut self) {
        let _ = self.out.flush();
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn set_status(&mut self, state: ConnectionState) {
        self.status = Some(state);
        let dot = match state {
            ConnectionState::Open => "●".green(),
            ConnectionState::Connecting => "●".yellow(),
            ConnectionState::ClosedRetrying => "●".red(),
        };
        self.emit(format!("{dot} {state}"));
        let _ = self.out.flush();
    }

    fn show_banner(&mut self, text: &str) {
        self.banner = Some(text.to_string());
        self.emit(text.red().bold().to_string());
        let _ = self.out.flush();
    }

    fn hide_banner(&mut self) {
        self.banner = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(key: &str, class: MessageClass, body: MessageBody) -> RenderedMessage {
        RenderedMessage {
            key: key.to_string(),
            class,
            sender_label: None,
            body,
            timestamp: "10:00".to_string(),
        }
    }

    fn output(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn append_returns_positions_in_order() {
        colored::control::set_override(false);
        let mut v = TerminalView::new(Vec::new());
        assert_eq!(v.append(&msg("msg-a", MessageClass::Sent, MessageBody::Text("a".into()))), 0);
        assert_eq!(v.append(&msg("msg-b", MessageClass::Received, MessageBody::Text("b".into()))), 1);
        assert_eq!(v.entries().len(), 2);
    }

    #[test]
    fn replace_keeps_class_and_marks_update() {
        colored::control::set_override(false);
        let mut v = TerminalView::new(Vec::new());
        let h = v.append(&msg("msg-a", MessageClass::Received, MessageBody::Translating));
        v.replace(&h, &msg("msg-a", MessageClass::Sent, MessageBody::Text("hello".into())));
        assert_eq!(v.entries()[0].class, MessageClass::Received);
        assert_eq!(v.entries()[0].body, MessageBody::Text("hello".into()));
        let out = output(v);
        assert!(out.contains("↻#0"), "{out}");
        assert!(out.contains("hello"), "{out}");
    }

    #[test]
    fn text_is_printed_unescaped() {
        colored::control::set_override(false);
        let mut v = TerminalView::new(Vec::new());
        v.append(&msg("msg-a", MessageClass::Received, MessageBody::Text("<b>hi</b>".into())));
        let out = output(v);
        assert!(out.contains("<b>hi</b>"), "{out}");
        assert!(!out.contains("&lt;"), "{out}");
    }

    #[test]
    fn replace_unknown_handle_is_ignored() {
        let mut v = TerminalView::new(Vec::new());
        v.replace(&5, &msg("msg-x", MessageClass::Sent, MessageBody::Empty));
        assert!(v.entries().is_empty());
    }

    #[test]
    fn status_and_banner_are_tracked() {
        colored::control::set_override(false);
        let mut v = TerminalView::new(Vec::new());
        v.set_status(ConnectionState::Open);
        v.show_banner("⚠️ boom");
        assert_eq!(v.status(), Some(ConnectionState::Open));
        assert_eq!(v.banner(), Some("⚠️ boom"));
        v.hide_banner();
        assert!(v.banner().is_none());
        let out = output(v);
        assert!(out.contains("connected"));
        assert!(out.contains("boom"));
    }
}
