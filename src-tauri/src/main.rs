use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use nlplab_core::agents::{ClientConfig, GeminiClient};
use nlplab_core::api::v1::{self, ApiState};
use nlplab_core::credentials::SqliteCredentialStore;
use nlplab_core::db::init_db;
use nlplab_core::runner::TaskRunner;
use tauri::Manager;

fn workspace_dir() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("com", "NLPLab", "NLPLab") {
        proj.data_dir().to_path_buf()
    } else {
        std::env::temp_dir().join("NLPLab")
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .setup(|app| {
            let db = init_db(workspace_dir())?;
            let config = ClientConfig::from_env();
            log::info!("using Gemini endpoint {}", config.base_url);
            let client = GeminiClient::new(config)?;
            let store = SqliteCredentialStore::new(db.clone());
            let runner = TaskRunner::load(Arc::new(client), Arc::new(store))?;
            app.manage(ApiState {
                db,
                runner: Arc::new(runner),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            v1::ping,
            v1::lab_state,
            v1::lab_modes,
            v1::lab_models,
            v1::lab_save_credential,
            v1::lab_clear_credential,
            v1::lab_set_mode,
            v1::lab_set_model,
            v1::lab_set_input,
            v1::lab_execute_task,
            v1::lab_list_available_models,
            v1::lab_events
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
