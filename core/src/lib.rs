//! Core library for NLP Lab, a small desktop front-end for the Gemini API.
//!
//! - [`agents`] talks to the generative API and holds its connection settings.
//! - [`api`] exposes the IPC surface that the Tauri UI invokes (feature `ipc`).
//! - [`credentials`] persists the API key between sessions.
//! - [`db`] initialises the SQLite database and applies migrations.
//! - [`errors`] keeps the error catalogue with human friendly metadata.
//! - [`logging`] writes structured diagnostics to the event log table.
//! - [`models`] and [`prompt`] hold the fixed model list and task templates.
//! - [`runner`] owns the interactive state and drives each request.

pub mod agents;
#[cfg(feature = "ipc")]
pub mod api;
pub mod credentials;
pub mod db;
pub mod errors;
pub mod logging;
pub mod models;
pub mod prompt;
pub mod runner;
