//! Shared test helpers

// Each test binary uses a different subset
#![allow(dead_code)]

pub mod lsp;
pub mod session;

#[allow(unused_imports)]
pub use lsp::*;
#[allow(unused_imports)]
pub use session::*;
