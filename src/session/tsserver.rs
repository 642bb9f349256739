//! AnalysisSession backed by a tsserver child process

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::process::{Child, Command as ProcessCommand};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::TsServerConfig;
use crate::session::codec::{FrameReader, LineWriter};
use crate::session::error::SessionError;
use crate::session::protocol::{
    CodeFixAction, CodeFixRequestArgs, Command, Diagnostic, FileLocationRequestArgs,
    FileRequestArgs, IncomingMessage, Location, NavigationTree, ReferencesResponseBody,
    RequestMessage, UpdateOpenArgs,
};
use crate::session::traits::AnalysisSession;

const WRITER_CHANNEL_CAPACITY: usize = 64;

/// Requests waiting for a response, keyed by `seq`
#[derive(Debug, Default)]
struct PendingRequests {
    /// Set once tsserver can no longer answer; no request is accepted after it
    closed: bool,
    waiters: HashMap<u64, oneshot::Sender<IncomingMessage>>,
}

impl PendingRequests {
    fn register(&mut self, seq: u64) -> Result<oneshot::Receiver<IncomingMessage>, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(seq, tx);
        Ok(rx)
    }

    fn complete(&mut self, seq: u64, message: IncomingMessage) {
        if let Some(tx) = self.waiters.remove(&seq) {
            let _ = tx.send(message);
        }
    }

    /// Fail every waiting request and refuse new ones
    fn close(&mut self) {
        self.closed = true;
        // Dropping the senders wakes the waiters with an error
        self.waiters.clear();
    }
}

type Pending = Arc<Mutex<PendingRequests>>;

fn lock(pending: &Mutex<PendingRequests>) -> MutexGuard<'_, PendingRequests> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the waiter of an abandoned request
struct WaiterGuard<'a> {
    seq: u64,
    pending: &'a Mutex<PendingRequests>,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).waiters.remove(&self.seq);
    }
}

pub struct TsServerSession {
    writer_tx: mpsc::Sender<Vec<u8>>,
    next_seq: AtomicU64,
    pending: Pending,
    _child: Child,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl TsServerSession {
    /// Spawn tsserver and start the reader and writer tasks
    pub fn spawn(config: &TsServerConfig) -> Result<Self, SessionError> {
        info!("Starting tsserver: {} {:?}", config.command, config.args);

        let mut child = ProcessCommand::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(SessionError::Closed)?;
        let stdout = child.stdout.take().ok_or(SessionError::Closed)?;

        let pending: Pending = Arc::new(Mutex::new(PendingRequests::default()));

        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(WRITER_CHANNEL_CAPACITY);
        let writer_pending = pending.clone();
        let writer_handle = tokio::spawn(async move {
            let mut writer = LineWriter::new(stdin);
            while let Some(line) = writer_rx.recv().await {
                if let Err(e) = writer.write_line(&line).await {
                    warn!("tsserver write error: {}", e);
                    // Requests still queued behind this one are dropped with the channel
                    lock(&writer_pending).close();
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_handle = tokio::spawn(async move {
            let mut reader = FrameReader::new(stdout);
            loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => Self::dispatch_frame(&frame, &reader_pending),
                    Ok(None) => {
                        info!("tsserver closed stdout");
                        break;
                    }
                    Err(e) => {
                        warn!("tsserver reader error: {}", e);
                        break;
                    }
                }
            }
            lock(&reader_pending).close();
        });

        Ok(Self {
            writer_tx,
            next_seq: AtomicU64::new(1),
            pending,
            _child: child,
            reader_handle,
            writer_handle,
        })
    }

    fn dispatch_frame(frame: &[u8], pending: &Mutex<PendingRequests>) {
        let message: IncomingMessage = match serde_json::from_slice(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring malformed tsserver message: {}", e);
                return;
            }
        };

        match (message.kind.as_str(), message.request_seq) {
            ("response", Some(request_seq)) => lock(pending).complete(request_seq, message),
            ("event", _) => {
                trace!("tsserver event: {:?}", message.event);
            }
            (kind, _) => {
                trace!("Ignoring tsserver message of type {}", kind);
            }
        }
    }

    /// Send `command` and wait for its response
    ///
    /// Returns `Ok(None)` when the response carries no body, and
    /// `SessionError::Closed` once tsserver has exited or its output broke.
    pub async fn execute<A, B>(
        &self,
        command: Command,
        arguments: Option<A>,
    ) -> Result<Option<B>, SessionError>
    where
        A: Serialize + Send,
        B: DeserializeOwned,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_vec(&RequestMessage {
            seq,
            kind: "request",
            command: command.as_str(),
            arguments,
        })?;

        let rx = lock(&self.pending).register(seq)?;
        let _waiter = WaiterGuard {
            seq,
            pending: &self.pending,
        };

        debug!("tsserver request #{} {}", seq, command);
        if self.writer_tx.send(line).await.is_err() {
            return Err(SessionError::Closed);
        }

        let response = rx.await.map_err(|_| SessionError::Closed)?;

        if response.success == Some(false) {
            return Err(SessionError::CommandFailed {
                command,
                message: response.message.unwrap_or_default(),
            });
        }

        match response.body {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
        }
    }
}

impl Drop for TsServerSession {
    fn drop(&mut self) {
        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}

fn file_arg(file: &Path) -> FileRequestArgs {
    FileRequestArgs {
        file: file.to_string_lossy().into_owned(),
    }
}

#[async_trait::async_trait]
impl AnalysisSession for TsServerSession {
    async fn navtree(&self, file: &Path) -> Result<Option<NavigationTree>, SessionError> {
        self.execute(Command::NavTree, Some(file_arg(file))).await
    }

    async fn references(
        &self,
        file: &Path,
        location: Location,
    ) -> Result<Option<ReferencesResponseBody>, SessionError> {
        let args = FileLocationRequestArgs {
            file: file.to_string_lossy().into_owned(),
            line: location.line,
            offset: location.offset,
        };
        self.execute(Command::References, Some(args)).await
    }

    async fn update_open(&self, args: UpdateOpenArgs) -> Result<(), SessionError> {
        self.execute::<_, serde_json::Value>(Command::UpdateOpen, Some(args))
            .await
            .map(|_| ())
    }

    async fn semantic_diagnostics_sync(
        &self,
        file: &Path,
    ) -> Result<Option<Vec<Diagnostic>>, SessionError> {
        self.execute(Command::SemanticDiagnosticsSync, Some(file_arg(file))).await
    }

    async fn supported_code_fixes(&self) -> Result<Option<Vec<String>>, SessionError> {
        self.execute(Command::GetSupportedCodeFixes, None::<()>).await
    }

    async fn code_fixes(
        &self,
        args: CodeFixRequestArgs,
    ) -> Result<Option<Vec<CodeFixAction>>, SessionError> {
        self.execute(Command::GetCodeFixes, Some(args)).await
    }
}
