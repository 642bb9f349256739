//! Related-files check engine
//!
//! A check starts from a trigger file and cursor line, resolves the files
//! related to the symbol under the cursor, makes sure the analysis service
//! has them open, records their semantic diagnostics against the trigger and
//! finally closes whatever was opened only for the check.
//!
//! # Modules
//!
//! - [`checker`]: RelatedFilesChecker, the entry point of a check
//! - [`resolver`]: builds the check list
//! - [`driver`]: opens, fetches diagnostics and releases
//! - [`tracker`]: the single owner of "open to the service" state
//! - [`store`]: diagnostics per file with trigger attribution
//! - [`busy`]: busy signal for in-flight checks
//! - [`editor`]: Editor trait and the in-memory workspace model
//! - [`watcher`]: FileWatcher trait and implementations
//! - [`navtree`]: navigation tree lookups
//! - [`types`]: CheckList and SourceFilter
//! - [`error`]: CheckError and WatchError

pub mod busy;
pub mod checker;
pub mod driver;
pub mod editor;
pub mod error;
pub mod navtree;
pub mod resolver;
pub mod store;
pub mod tracker;
pub mod types;
pub mod watcher;

pub use busy::BusySignal;
pub use checker::RelatedFilesChecker;
pub use driver::CycleReport;
pub use editor::{Editor, WorkspaceEditor};
pub use error::{CheckError, WatchError};
pub use store::DiagnosticsStore;
pub use tracker::OpenFileTracker;
pub use watcher::{FileWatcher, NoopWatcher, NotifyWatcher};
