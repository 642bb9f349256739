use serde::Deserialize;
use std::path::PathBuf;

// =============================================================================
// Defaults
// =============================================================================

/// Command used to start tsserver when none is configured
pub const DEFAULT_TSSERVER_COMMAND: &str = "tsserver";

/// File extensions the analysis service can diagnose
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Label reported to busy observers while a check cycle runs
pub const CHECK_RELATED_FILES_LABEL: &str = "checkRelatedFiles";

/// Command name clients execute to check files related to the cursor
pub const CHECK_RELATED_FILES_COMMAND: &str = "relatedFiles.check";

pub const LOG_FILE_NAME: &str = "related-files-lsp.log";

/// LSP configuration structure (sent as `initializationOptions`)
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LspConfig {
    pub tsserver: TsServerConfig,
    pub check: CheckConfig,
}

/// How to start the analysis service
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TsServerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for TsServerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_TSSERVER_COMMAND.to_string(),
            args: Vec::new(),
        }
    }
}

/// Check cycle configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckConfig {
    /// Extensions (without the dot) of files that may enter a check list
    pub source_extensions: Vec<String>,
    /// Issue the per-file diagnostics requests of a cycle together
    pub concurrent_diagnostics: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            concurrent_diagnostics: false,
        }
    }
}

/// Returns the path to the data directory for related-files-lsp.
/// Uses $XDG_DATA_HOME/related-files-lsp if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/related-files-lsp,
/// or ./related-files-lsp if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("related-files-lsp")
}
