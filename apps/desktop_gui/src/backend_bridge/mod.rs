//! Bridge between the egui thread and the tokio-backed orchestration core.

pub mod commands;
pub mod runtime;
