//! LSP server initialization and lifecycle

use anyhow::Context;
use tower_lsp::{LspService, Server};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{LOG_FILE_NAME, data_dir};
use crate::lsp::backend::Backend;

/// Serve LSP over stdio until the client disconnects
pub async fn run_server() -> anyhow::Result<()> {
    // Logs must never reach stdout, it carries the protocol
    let _guard = init_logging()?;

    info!("Starting related-files-lsp v{}", env!("CARGO_PKG_VERSION"));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    info!("related-files-lsp stopped");
    Ok(())
}

fn init_logging() -> anyhow::Result<WorkerGuard> {
    let dir = data_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}
