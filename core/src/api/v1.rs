//! Version 1 of the Tauri IPC API.
//!
//! Commands are thin wrappers around [`TaskRunner`]: each one performs the
//! action, records an audit event where it matters and hands the page a fresh
//! [`LabSnapshot`] to render. Task failures are part of the snapshot, so the
//! `Err` side of a command only carries infrastructure problems.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tauri::{async_runtime::spawn_blocking, State};
use time::OffsetDateTime;

use crate::db::DbPool;
use crate::errors::LabError;
use crate::logging::{self, log_event, log_lab_error, EventRecord};
use crate::models::{ModelOption, AVAILABLE_MODELS};
use crate::prompt::{Mode, ModeInfo, MODES};
use crate::runner::{LabSnapshot, TaskRunner};

const DEFAULT_EVENT_LIMIT: usize = 50;

/// Shared state injected into each Tauri command handler.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub runner: Arc<TaskRunner>,
}

/// Simple health-check endpoint for UI components.
#[tauri::command]
pub fn ping() -> Value {
    json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

#[tauri::command]
pub fn lab_state(state: State<ApiState>) -> LabSnapshot {
    state.runner.snapshot()
}

#[tauri::command]
pub fn lab_modes() -> Vec<ModeInfo> {
    MODES.to_vec()
}

#[tauri::command]
pub fn lab_models() -> Vec<ModelOption> {
    AVAILABLE_MODELS.to_vec()
}

#[derive(Deserialize)]
pub struct SaveCredentialInput {
    pub api_key: String,
}

/// Store the API key; a blank key behaves like [`lab_clear_credential`].
#[tauri::command]
pub async fn lab_save_credential(
    state: State<'_, ApiState>,
    input: SaveCredentialInput,
) -> Result<LabSnapshot, String> {
    let runner = state.runner.clone();
    let snapshot = spawn_blocking(move || runner.save_credential(&input.api_key))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    let message = if snapshot.has_credential {
        "API key saved"
    } else {
        "API key cleared"
    };
    audit(&state.db, logging::MODULE_CREDENTIALS, message, Ok(()), None).await;
    Ok(snapshot)
}

#[tauri::command]
pub async fn lab_clear_credential(state: State<'_, ApiState>) -> Result<LabSnapshot, String> {
    let runner = state.runner.clone();
    let snapshot = spawn_blocking(move || runner.clear_credential())
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    audit(
        &state.db,
        logging::MODULE_CREDENTIALS,
        "API key cleared",
        Ok(()),
        None,
    )
    .await;
    Ok(snapshot)
}

/// Unknown identifiers select chat.
#[tauri::command]
pub fn lab_set_mode(state: State<ApiState>, mode: String) -> LabSnapshot {
    state.runner.set_mode(Mode::from_id_lossy(&mode))
}

#[tauri::command]
pub fn lab_set_model(state: State<ApiState>, model: String) -> Result<LabSnapshot, String> {
    state.runner.set_model(&model).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn lab_set_input(state: State<ApiState>, input: String) -> LabSnapshot {
    state.runner.set_input(input)
}

#[derive(Deserialize)]
pub struct ExecuteTaskInput {
    pub input: Option<String>,
}

/// Run the current task. Passing `input` updates the text first.
#[tauri::command]
pub async fn lab_execute_task(
    state: State<'_, ApiState>,
    input: Option<ExecuteTaskInput>,
) -> Result<LabSnapshot, String> {
    if let Some(text) = input.and_then(|i| i.input) {
        state.runner.set_input(text);
    }
    let before = state.runner.snapshot();
    let outcome = state.runner.execute_task().await;
    let data = json!({
        "mode": before.mode,
        "model": before.model,
        "input_chars": before.input.chars().count(),
    });
    audit(
        &state.db,
        logging::MODULE_TASKS,
        "task executed",
        outcome.as_ref().map(|_| ()),
        Some(data),
    )
    .await;
    Ok(state.runner.snapshot())
}

#[tauri::command]
pub async fn lab_list_available_models(
    state: State<'_, ApiState>,
) -> Result<LabSnapshot, String> {
    let outcome = state.runner.list_available_models().await;
    audit(
        &state.db,
        logging::MODULE_TASKS,
        "model listing requested",
        outcome.as_ref().map(|_| ()),
        None,
    )
    .await;
    Ok(state.runner.snapshot())
}

/// Return recent audit events for diagnostics.
#[tauri::command]
pub async fn lab_events(
    state: State<'_, ApiState>,
    module: Option<String>,
    limit: Option<usize>,
) -> Result<Vec<EventRecord>, String> {
    let pool = state.db.clone();
    spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        logging::recent_events(
            &conn,
            module.as_deref(),
            limit.unwrap_or(DEFAULT_EVENT_LIMIT),
        )
        .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}

/// Best-effort audit write; a failing event log never fails the command.
async fn audit(
    db: &DbPool,
    module: &'static str,
    message: &'static str,
    outcome: Result<(), &LabError>,
    data: Option<Value>,
) {
    let pool = db.clone();
    let error = outcome.err().cloned();
    let written = spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let result = match error {
            None => log_event(&conn, "info", None, module, message, None, data),
            Some(err) => log_lab_error(&conn, module, message, &err, data),
        };
        result.map_err(|e| e.to_string())
    })
    .await;
    let failure = match written {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err,
        Err(err) => err.to_string(),
    };
    log::warn!("failed to record {module} event: {failure}");
}
