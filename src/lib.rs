pub mod check;
pub mod codefix;
pub mod config;
pub mod lsp;
pub mod session;
