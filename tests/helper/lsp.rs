//! LSP request/notification test utilities

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tower_lsp::ClientSocket;
use tower_lsp::jsonrpc::Request;
use tower_lsp::lsp_types::*;

/// Create an LSP initialize request for a workspace rooted at `root_uri`
pub fn create_initialize_request(id: i64, root_uri: &str, options: Option<Value>) -> Request {
    Request::build("initialize")
        .id(id)
        .params(
            serde_json::to_value(InitializeParams {
                workspace_folders: Some(vec![WorkspaceFolder {
                    uri: root_uri.parse().unwrap(),
                    name: "test".to_string(),
                }]),
                initialization_options: options,
                ..Default::default()
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP initialized notification
pub fn create_initialized_notification() -> Request {
    Request::build("initialized")
        .params(serde_json::to_value(InitializedParams {}).unwrap())
        .finish()
}

/// Create an LSP didOpen notification
pub fn create_did_open_notification(uri: &str, content: &str) -> Request {
    Request::build("textDocument/didOpen")
        .params(
            serde_json::to_value(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.parse().unwrap(),
                    language_id: "typescript".to_string(),
                    version: 1,
                    text: content.to_string(),
                },
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP didClose notification
pub fn create_did_close_notification(uri: &str) -> Request {
    Request::build("textDocument/didClose")
        .params(
            serde_json::to_value(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier {
                    uri: uri.parse().unwrap(),
                },
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP didSave notification
pub fn create_did_save_notification(uri: &str) -> Request {
    Request::build("textDocument/didSave")
        .params(
            serde_json::to_value(DidSaveTextDocumentParams {
                text_document: TextDocumentIdentifier {
                    uri: uri.parse().unwrap(),
                },
                text: None,
            })
            .unwrap(),
        )
        .finish()
}

/// Create a workspace/executeCommand request running the related-files check
pub fn create_check_request(id: i64, uri: &str, line: u32) -> Request {
    Request::build("workspace/executeCommand")
        .id(id)
        .params(
            serde_json::to_value(ExecuteCommandParams {
                command: "relatedFiles.check".to_string(),
                arguments: vec![Value::from(uri), Value::from(line)],
                work_done_progress_params: Default::default(),
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP codeAction request
pub fn create_code_action_request(id: i64, uri: &str, line: u32, character: u32) -> Request {
    Request::build("textDocument/codeAction")
        .id(id)
        .params(
            serde_json::to_value(CodeActionParams {
                text_document: TextDocumentIdentifier {
                    uri: uri.parse().unwrap(),
                },
                range: Range {
                    start: Position { line, character },
                    end: Position { line, character },
                },
                context: CodeActionContext {
                    diagnostics: vec![],
                    only: None,
                    trigger_kind: None,
                },
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .unwrap(),
        )
        .finish()
}

/// Collect notifications in background and return a receiver
pub fn spawn_notification_collector(mut socket: ClientSocket) -> mpsc::Receiver<Request> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        while let Some(notification) = socket.next().await {
            if tx.send(notification).await.is_err() {
                break;
            }
        }
    });

    rx
}

/// Wait for a notification with the specified method name from the receiver
pub async fn wait_for_notification(
    rx: &mut mpsc::Receiver<Request>,
    method: &str,
) -> Option<Request> {
    let timeout_duration = Duration::from_secs(5);

    loop {
        match timeout(timeout_duration, rx.recv()).await {
            Ok(Some(notification)) => {
                if notification.method() == method {
                    return Some(notification);
                }
                // Skip other notifications (like log_message)
            }
            _ => return None,
        }
    }
}

/// Wait for the publishDiagnostics notification of one document
pub async fn wait_for_diagnostics(
    rx: &mut mpsc::Receiver<Request>,
    uri: &str,
) -> Option<PublishDiagnosticsParams> {
    loop {
        let notification = wait_for_notification(rx, "textDocument/publishDiagnostics").await?;
        let params: PublishDiagnosticsParams =
            serde_json::from_value(notification.params()?.clone()).ok()?;
        if params.uri.as_str() == uri {
            return Some(params);
        }
    }
}
