use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use tolk_chat::banner::ErrorBanner;
use tolk_chat::cli::Args;
use tolk_chat::config::ChatConfig;
use tolk_chat::connection::ConnectionManager;
use tolk_chat::reconciler::MessageReconciler;
use tolk_chat::terminal::TerminalView;
use tolk_chat::widget::ChatWidget;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the transcript.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("tolk_chat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = ChatConfig::from_args(&args)?;
    let session = config.session()?;
    let uploader = config.uploader(&session)?;
    let (conn, updates) = ConnectionManager::open(config.connection_config(&session)?);

    let view = TerminalView::new(std::io::stdout());
    let reconciler =
        MessageReconciler::with_sender_label(session.user_id().clone(), config.sender_label.clone());
    let banner = ErrorBanner::new(config.banner_duration());

    let widget = ChatWidget::new(session, view, reconciler, banner, uploader);
    widget
        .run(conn, updates, BufReader::new(tokio::io::stdin()))
        .await?;

    Ok(())
}
