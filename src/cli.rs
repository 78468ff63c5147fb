use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tolk-chat")]
#[command(version)]
#[command(about = "Terminal client for translated chat sessions")]
pub struct Args {
    /// TOML config file; flags below override its values
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// HTTP base URL of the chat server (e.g. https://clinic.example.no)
    #[arg(long)]
    pub server: Option<String>,

    /// Session id of the conversation to join
    #[arg(long)]
    pub session: Option<String>,

    /// Your user id as known to the server
    #[arg(long)]
    pub user: Option<String>,

    /// CSRF token sent with image uploads
    #[arg(long)]
    pub csrf_token: Option<String>,

    /// Milliseconds between reconnect attempts
    #[arg(long)]
    pub retry_ms: Option<u64>,

    /// Log filter used when RUST_LOG is not set (e.g. debug, tolk_chat=trace)
    #[arg(long, default_value = "tolk_chat=info")]
    pub log_level: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
