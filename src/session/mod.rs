//! Analysis session layer
//!
//! The check engine talks to the remote analysis service only through the
//! [`traits::AnalysisSession`] trait.
//!
//! # Modules
//!
//! - [`traits`]: AnalysisSession trait (one typed method per command)
//! - [`protocol`]: tsserver request/response shapes
//! - [`error`]: SessionError
//! - [`codec`]: stdio framing of tsserver messages
//! - [`tsserver`]: AnalysisSession backed by a tsserver child process

pub mod codec;
pub mod error;
pub mod protocol;
pub mod traits;
pub mod tsserver;

pub use error::SessionError;
pub use traits::AnalysisSession;
pub use tsserver::TsServerSession;
