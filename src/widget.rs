//! The chat widget: one event loop that ties the connection, the reconciler,
//! the error banner and uploads to a view.
//!
//! All mutable state (view, reconciler, banner) is owned by the loop in
//! [`ChatWidget::run`]; uploads run in their own task and report back over a
//! channel, so nothing here needs a lock.

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::banner::ErrorBanner;
use crate::connection::{ConnectionManager, ConnectionState, ConnectionUpdate};
use crate::error::ChatError;
use crate::protocol::{InboundFrame, UploadResponse};
use crate::reconciler::{MessageReconciler, MessageSurface, Reconciled};
use crate::session::Session;
use crate::upload::ImageUploader;

/// A render surface that can also show connection status and the banner.
pub trait ChatView: MessageSurface {
    fn set_status(&mut self, state: ConnectionState);

    fn show_banner(&mut self, text: &str);

    fn hide_banner(&mut self);
}

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Send(String),
    Upload(PathBuf),
    Quit,
    /// Blank line or unknown command; nothing to do.
    Ignore,
}

/// Interpret a line typed by the user.
///
/// `/image <path>` uploads, `/quit` exits, any other non-blank line is sent
/// as-is (leading/trailing whitespace preserved, like the input box).
pub fn parse_input(line: &str) -> InputCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputCommand::Ignore;
    }
    if trimmed == "/quit" {
        return InputCommand::Quit;
    }
    if let Some(rest) = trimmed.strip_prefix("/image") {
        let path = rest.trim();
        if rest.starts_with(char::is_whitespace) && !path.is_empty() {
            return InputCommand::Upload(PathBuf::from(path));
        }
        if rest.is_empty() {
            return InputCommand::Ignore;
        }
    }
    InputCommand::Send(line.to_string())
}

pub struct ChatWidget<V: ChatView> {
    session: Session,
    view: V,
    reconciler: MessageReconciler<V::Handle>,
    banner: ErrorBanner,
    uploader: ImageUploader,
    upload_in_flight: bool,
}

impl<V: ChatView> ChatWidget<V> {
    pub fn new(
        session: Session,
        view: V,
        reconciler: MessageReconciler<V::Handle>,
        banner: ErrorBanner,
        uploader: ImageUploader,
    ) -> Self {
        Self {
            session,
            view,
            reconciler,
            banner,
            uploader,
            upload_in_flight: false,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn reconciler(&self) -> &MessageReconciler<V::Handle> {
        &self.reconciler
    }

    pub fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    pub fn upload_in_flight(&self) -> bool {
        self.upload_in_flight
    }

    /// Route one update from the connection driver.
    pub fn handle_update(&mut self, update: ConnectionUpdate, now: Instant) -> Option<Reconciled> {
        match update {
            ConnectionUpdate::State(state) => {
                info!(%state, "connection state changed");
                self.view.set_status(state);
                None
            }
            ConnectionUpdate::Frame(frame) => self.handle_frame(frame, now),
        }
    }

    /// Error alerts go to the banner; chat records are reconciled.
    pub fn handle_frame(&mut self, frame: InboundFrame, now: Instant) -> Option<Reconciled> {
        match frame {
            InboundFrame::ErrorAlert { error } => {
                self.show_error(&error, now);
                None
            }
            InboundFrame::Message(record) => Some(self.reconciler.apply(&mut self.view, &record)),
        }
    }

    pub fn show_error(&mut self, message: &str, now: Instant) {
        let text = self.banner.show(message, now).to_string();
        self.view.show_banner(&text);
    }

    /// Hide the banner once its deadline has passed.
    pub fn expire_banner(&mut self, now: Instant) {
        if self.banner.expire(now) {
            self.view.hide_banner();
        }
    }

    /// Send `text` if the connection is open. A successful send hides the banner.
    pub fn submit(&mut self, conn: &ConnectionManager, text: &str) -> Result<(), ChatError> {
        conn.send(text)?;
        self.banner.hide();
        self.view.hide_banner();
        Ok(())
    }

    /// Reserve the single upload slot.
    pub fn begin_upload(&mut self) -> Result<ImageUploader, ChatError> {
        if self.upload_in_flight {
            return Err(ChatError::UploadInFlight);
        }
        self.upload_in_flight = true;
        Ok(self.uploader.clone())
    }

    /// Release the upload slot and surface an application error, if any.
    ///
    /// Transport and decode failures are logged only.
    pub fn finish_upload(&mut self, result: Result<UploadResponse, ChatError>, now: Instant) {
        self.upload_in_flight = false;
        match result {
            Ok(UploadResponse { error: Some(error) }) => self.show_error(&error, now),
            Ok(_) => debug!("upload accepted"),
            Err(e) => warn!(error = %e, "upload failed"),
        }
    }

    /// Drive the widget until `/quit` or end of input, then dispose the
    /// connection and hand the view back.
    ///
    /// End of input waits for an upload still in flight.
    pub async fn run<R>(
        mut self,
        conn: ConnectionManager,
        mut updates: mpsc::UnboundedReceiver<ConnectionUpdate>,
        input: R,
    ) -> Result<V, ChatError>
    where
        R: AsyncBufRead + Unpin,
    {
        info!(session = %self.session.id(), user = %self.session.user_id(), "chat widget started");
        let mut lines = LinesStream::new(input.lines());
        let (upload_tx, mut upload_rx) = mpsc::unbounded_channel();
        let mut input_open = true;

        loop {
            tokio::select! {
                Some(update) = updates.recv() => {
                    self.handle_update(update, Instant::now());
                }
                line = lines.next(), if input_open => match line {
                    Some(Ok(line)) => match parse_input(&line) {
                        InputCommand::Send(text) => {
                            if let Err(e) = self.submit(&conn, &text) {
                                debug!(error = %e, "message not sent");
                            }
                        }
                        InputCommand::Upload(path) => match self.begin_upload() {
                            Ok(uploader) => {
                                let tx = upload_tx.clone();
                                tokio::spawn(async move {
                                    let result = uploader.upload_file(&path).await;
                                    let _ = tx.send(result);
                                });
                            }
                            Err(e) => warn!(error = %e, "upload not started"),
                        },
                        InputCommand::Quit => break,
                        InputCommand::Ignore => {}
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "input error");
                        input_open = false;
                    }
                    None => input_open = false,
                },
                Some(result) = upload_rx.recv() => {
                    self.finish_upload(result, Instant::now());
                }
                _ = banner_deadline(self.banner.deadline()) => {
                    self.expire_banner(Instant::now());
                }
            }

            if !input_open && !self.upload_in_flight {
                break;
            }
        }

        conn.dispose().await;
        info!("chat widget stopped");
        Ok(self.view)
    }
}

async fn banner_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
