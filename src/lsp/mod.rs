//! LSP (Language Server Protocol) implementation layer
//!
//! This module handles communication with editors via LSP. It feeds editor
//! events into the check engine, runs checks on request and publishes the
//! resulting diagnostics.
//!
//! # Modules
//!
//! - [`backend`]: Main LSP backend implementing `LanguageServer` trait
//! - [`diagnostics`]: tsserver to LSP position and diagnostic conversion
//! - [`code_action`]: Quick fixes built from tsserver code fixes
//! - [`server`]: LSP server initialization and lifecycle

pub mod backend;
pub mod code_action;
pub mod diagnostics;
pub mod server;
