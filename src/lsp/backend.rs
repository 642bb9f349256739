use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::{OnceCell, broadcast, mpsc};
use tower_lsp::jsonrpc::{Error as RpcError, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info, warn};

use crate::check::tracker::run_file_events;
use crate::check::types::SourceFilter;
use crate::check::watcher::FileEvent;
use crate::check::{
    BusySignal, DiagnosticsStore, Editor, FileWatcher, NoopWatcher, NotifyWatcher,
    OpenFileTracker, RelatedFilesChecker, WorkspaceEditor,
};
use crate::codefix::CodefixProvider;
use crate::config::{CHECK_RELATED_FILES_COMMAND, LspConfig};
use crate::lsp::code_action::to_code_action;
use crate::lsp::diagnostics::{to_lsp_diagnostic, to_text_span};
use crate::session::{AnalysisSession, TsServerSession};

/// Check engine, available once the analysis session is running
struct Engine {
    tracker: Arc<OpenFileTracker>,
    checker: RelatedFilesChecker,
    codefix: CodefixProvider,
    filter: SourceFilter,
    /// Reload saved files from didSave; only when no file watcher reports them
    reload_on_save: bool,
}

pub struct Backend {
    client: Client,
    editor: Arc<WorkspaceEditor>,
    store: Arc<DiagnosticsStore>,
    busy: BusySignal,
    preset: Option<(Arc<dyn AnalysisSession>, Arc<dyn FileWatcher>)>,
    engine: OnceCell<Engine>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::with_preset(client, None)
    }

    /// Build a Backend with a custom session and watcher instead of tsserver
    pub fn build(
        client: Client,
        session: Arc<dyn AnalysisSession>,
        watcher: Arc<dyn FileWatcher>,
    ) -> Self {
        Self::with_preset(client, Some((session, watcher)))
    }

    fn with_preset(
        client: Client,
        preset: Option<(Arc<dyn AnalysisSession>, Arc<dyn FileWatcher>)>,
    ) -> Self {
        Self {
            client,
            editor: Arc::new(WorkspaceEditor::default()),
            store: Arc::new(DiagnosticsStore::new()),
            busy: BusySignal::new(),
            preset,
            engine: OnceCell::new(),
        }
    }

    pub fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                    ..Default::default()
                },
            )),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: vec![CHECK_RELATED_FILES_COMMAND.to_string()],
                ..Default::default()
            }),
            code_action_provider: Some(CodeActionProviderCapability::Options(
                CodeActionOptions {
                    code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                    ..Default::default()
                },
            )),
            ..Default::default()
        }
    }

    fn read_config(params: &InitializeParams) -> LspConfig {
        let Some(options) = params.initialization_options.clone() else {
            return LspConfig::default();
        };

        serde_json::from_value(options)
            .inspect_err(|e| warn!("Invalid initializationOptions, using defaults: {}", e))
            .unwrap_or_default()
    }

    #[allow(deprecated)]
    fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
        let uris: Vec<&Url> = match &params.workspace_folders {
            Some(folders) if !folders.is_empty() => folders.iter().map(|f| &f.uri).collect(),
            _ => params.root_uri.iter().collect(),
        };

        uris.into_iter()
            .filter_map(|uri| uri.to_file_path().ok())
            .collect()
    }

    fn start_watcher() -> (Arc<dyn FileWatcher>, Option<mpsc::UnboundedReceiver<FileEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        match NotifyWatcher::new(tx) {
            Ok(watcher) => (Arc::new(watcher) as Arc<dyn FileWatcher>, Some(rx)),
            Err(e) => {
                warn!("File watching disabled: {}", e);
                (Arc::new(NoopWatcher) as Arc<dyn FileWatcher>, None)
            }
        }
    }

    fn start_engine(&self, config: &LspConfig) -> anyhow::Result<Engine> {
        let (session, watcher, events) = match &self.preset {
            Some((session, watcher)) => (session.clone(), watcher.clone(), None),
            None => {
                let session: Arc<dyn AnalysisSession> =
                    Arc::new(TsServerSession::spawn(&config.tsserver)?);
                let (watcher, events) = Self::start_watcher();
                (session, watcher, events)
            }
        };

        let tracker = Arc::new(OpenFileTracker::new(session.clone(), watcher));
        let reload_on_save = self.preset.is_none() && events.is_none();
        if let Some(events) = events {
            tokio::spawn(run_file_events(tracker.clone(), events));
        }

        let editor: Arc<dyn Editor> = self.editor.clone();
        Ok(Engine {
            checker: RelatedFilesChecker::new(
                session.clone(),
                editor,
                tracker.clone(),
                self.store.clone(),
                self.busy.clone(),
                &config.check,
            ),
            codefix: CodefixProvider::new(session, self.store.clone()),
            filter: SourceFilter::new(config.check.source_extensions.iter().cloned()),
            reload_on_save,
            tracker,
        })
    }

    fn spawn_diagnostics_publisher(&self) {
        let mut changes = self.store.subscribe();
        let store = self.store.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            loop {
                let path = match changes.recv().await {
                    Ok(path) => path,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Diagnostics publisher skipped {} updates", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let Ok(uri) = Url::from_file_path(&path) else {
                    continue;
                };
                let diagnostics = store
                    .errors_for_file(&path)
                    .iter()
                    .map(to_lsp_diagnostic)
                    .collect();
                client.publish_diagnostics(uri, diagnostics, None).await;
            }
        });
    }

    fn spawn_busy_logger(&self) {
        let mut labels = self.busy.subscribe();
        let client = self.client.clone();

        tokio::spawn(async move {
            while labels.changed().await.is_ok() {
                let current = labels.borrow_and_update().clone();
                let message = if current.is_empty() {
                    "Idle".to_string()
                } else {
                    format!("Busy: {}", current.join(", "))
                };
                client.log_message(MessageType::LOG, message).await;
            }
        });
    }

    /// Engine and file path for a document, if both are usable
    fn document(&self, uri: &Url) -> Option<(&Engine, PathBuf)> {
        let engine = self.engine.get()?;
        let path = uri.to_file_path().ok()?;
        Some((engine, path))
    }

    async fn check_related_files(&self, arguments: &[Value]) -> Result<Option<Value>> {
        let (uri, line) = parse_check_arguments(arguments)?;

        let Some(engine) = self.engine.get() else {
            self.client
                .show_message(MessageType::ERROR, "tsserver is not running")
                .await;
            return Ok(None);
        };
        let Ok(path) = uri.to_file_path() else {
            return Err(RpcError::invalid_params(format!("Not a file URI: {uri}")));
        };

        match engine.checker.check(&path, line.saturating_add(1)).await {
            Ok(report) => Ok(Some(json!({
                "checked": report.checked.len(),
                "failed": report.failed.len(),
            }))),
            Err(e) => {
                error!("Check of {:?} failed: {}", path, e);
                self.client
                    .show_message(MessageType::ERROR, format!("Check failed: {e}"))
                    .await;
                Ok(None)
            }
        }
    }
}

fn parse_check_arguments(arguments: &[Value]) -> Result<(Url, u32)> {
    let [uri, line, ..] = arguments else {
        return Err(RpcError::invalid_params("Expected [uri, line]"));
    };

    let uri: Url = serde_json::from_value(uri.clone())
        .map_err(|e| RpcError::invalid_params(format!("Invalid uri: {e}")))?;
    let line: u32 = serde_json::from_value(line.clone())
        .map_err(|e| RpcError::invalid_params(format!("Invalid line: {e}")))?;
    Ok((uri, line))
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.client
            .log_message(MessageType::INFO, "LSP server initializing")
            .await;

        let config = Self::read_config(&params);
        self.editor.set_roots(Self::workspace_roots(&params));

        match self.start_engine(&config) {
            Ok(engine) => {
                if self.engine.set(engine).is_err() {
                    warn!("initialize called more than once");
                }
            }
            Err(e) => {
                error!("Failed to start analysis session: {}", e);
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Failed to start tsserver: {e}"),
                    )
                    .await;
            }
        }

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "related-files-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "LSP server initialized")
            .await;
        self.spawn_diagnostics_publisher();
        self.spawn_busy_logger();
    }

    async fn shutdown(&self) -> Result<()> {
        self.client
            .log_message(MessageType::INFO, "LSP server shutting down")
            .await;
        if let Some(engine) = self.engine.get() {
            engine.tracker.dispose().await;
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let Ok(path) = uri.to_file_path() else {
            return;
        };
        debug!("Document opened: {}", uri);
        self.editor.open(path.clone());

        let Some(engine) = self.engine.get() else {
            return;
        };
        if !engine.filter.is_source_file(&path) {
            return;
        }
        let root = self.editor.project_root(&path);
        if let Err(e) = engine.tracker.editor_opened(&path, root.as_deref()).await {
            warn!("Failed to open {:?} in tsserver: {}", path, e);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let Ok(path) = uri.to_file_path() else {
            return;
        };
        debug!("Document closed: {}", uri);
        self.editor.close(&path);

        if let Some(engine) = self.engine.get()
            && let Err(e) = engine.tracker.editor_closed(&path).await
        {
            warn!("Failed to close {:?} in tsserver: {}", path, e);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Some((engine, path)) = self.document(&params.text_document.uri) else {
            return;
        };
        if !engine.reload_on_save {
            return;
        }
        if let Err(e) = engine.tracker.on_file_changed(&path).await {
            warn!("Failed to reload {:?} in tsserver: {}", path, e);
        }
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        info!("Executing command {}", params.command);
        match params.command.as_str() {
            CHECK_RELATED_FILES_COMMAND => self.check_related_files(&params.arguments).await,
            other => Err(RpcError::invalid_params(format!("Unknown command: {other}"))),
        }
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let Some((engine, path)) = self.document(&params.text_document.uri) else {
            return Ok(None);
        };

        let span = to_text_span(&params.range);
        let fixes = match engine.codefix.run_code_fixes_in_range(&path, &span).await {
            Ok(fixes) => fixes,
            Err(e) => {
                warn!("Code fixes unavailable for {:?}: {}", path, e);
                return Ok(None);
            }
        };

        let actions: Vec<CodeActionOrCommand> = fixes
            .iter()
            .filter_map(to_code_action)
            .map(CodeActionOrCommand::CodeAction)
            .collect();

        Ok(Some(actions))
    }
}
