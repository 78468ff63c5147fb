//! # tolk-chat
//!
//! Terminal client for translated two-party chat sessions.
//!
//! The client keeps one socket open to the session endpoint (reconnecting on a
//! fixed interval when it drops), reconciles inbound message records into the
//! transcript by message id so that late translations update the original
//! message in place, sends text messages and uploads images over HTTP.

pub mod banner;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod reconciler;
pub mod render;
pub mod session;
pub mod terminal;
pub mod upload;
pub mod widget;

pub use error::ChatError;
pub use session::{Session, UserId};
