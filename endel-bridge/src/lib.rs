//! Endel sync bridge library.
//!
//! Owns the file-backed [`store::TaskStore`] and the HTTP endpoint that
//! lets a second device fetch or replace the whole task collection.
//! Used by the `endel-bridge` binary and embedded by the interactive client.

pub mod config;
pub mod server;
pub mod store;
