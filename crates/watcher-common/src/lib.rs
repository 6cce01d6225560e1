//! # watcher-common
//!
//! Shared error definitions, capture configuration, and constants used
//! across The Watcher workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives the socket-table engine and
//! the CLI both build upon.

pub mod config;
pub mod constants;
pub mod error;
