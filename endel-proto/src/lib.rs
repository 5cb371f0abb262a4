//! Shared definitions for the Endel task model and sync wire format.

pub mod task;
pub mod wire;
