//! Task runner owning the lab's interactive state.
//!
//! The runner keeps the selected mode and model, the input text, the
//! credential and a single display slot holding either a result or an error.
//! `execute_task` and `list_available_models` each perform one round trip to
//! the [`GenerativeClient`] and write their outcome back into that slot.
//!
//! Overlapping requests are allowed. Every dispatch takes a fresh generation
//! number and only the newest in-flight request may write its outcome; older
//! completions are dropped. Changing the mode leaves the in-flight request
//! running but marks it stale so its payload is discarded on arrival.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::agents::{GenerativeClient, ModelListing};
use crate::credentials::CredentialStore;
use crate::errors::LabError;
use crate::models::{strip_namespace, ModelSelection};
use crate::prompt::{build_prompt, Mode};

const LISTING_HEADER: &str = "Supported models for your API Key:";
const LISTING_FALLBACK: &str = "Could not fetch models list.";

/// Inputs captured when a task is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub mode: Mode,
    pub input: String,
    pub model: ModelSelection,
}

/// Serializable view of the runner for the UI. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabSnapshot {
    pub mode: Mode,
    pub model: ModelSelection,
    pub input: String,
    pub has_credential: bool,
    pub is_loading: bool,
    pub result: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Empty,
    Result(String),
    Error(String),
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    generation: u64,
    stale: bool,
}

#[derive(Default)]
struct RunnerState {
    credential: String,
    mode: Mode,
    model: ModelSelection,
    input: String,
    display: Slot,
    in_flight: Option<Ticket>,
    generation: u64,
}

impl RunnerState {
    fn require_credential(&self) -> Result<String, LabError> {
        if self.credential.trim().is_empty() {
            Err(LabError::MissingCredential)
        } else {
            Ok(self.credential.clone())
        }
    }

    /// Claim the display slot for a new request.
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight = Some(Ticket {
            generation: self.generation,
            stale: false,
        });
        self.display = Slot::Empty;
        self.generation
    }

    /// Fail a dispatch before it reaches the client. Any request still in
    /// flight loses the display slot to this error.
    fn reject(&mut self, err: LabError) -> LabError {
        self.generation += 1;
        self.in_flight = None;
        self.display = Slot::Error(err.to_string());
        err
    }

    fn snapshot(&self) -> LabSnapshot {
        let (result, error) = match &self.display {
            Slot::Empty => (None, None),
            Slot::Result(text) => (Some(text.clone()), None),
            Slot::Error(message) => (None, Some(message.clone())),
        };
        LabSnapshot {
            mode: self.mode,
            model: self.model,
            input: self.input.clone(),
            has_credential: !self.credential.trim().is_empty(),
            is_loading: self.in_flight.is_some(),
            result,
            error,
        }
    }
}

pub struct TaskRunner {
    client: Arc<dyn GenerativeClient>,
    store: Arc<dyn CredentialStore>,
    state: Mutex<RunnerState>,
}

impl TaskRunner {
    /// Build a runner, reading the stored credential once.
    pub fn load(
        client: Arc<dyn GenerativeClient>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, LabError> {
        let credential = store.get()?.unwrap_or_default();
        Ok(Self {
            client,
            store,
            state: Mutex::new(RunnerState {
                credential,
                ..RunnerState::default()
            }),
        })
    }

    pub fn snapshot(&self) -> LabSnapshot {
        self.state().snapshot()
    }

    /// Persist `value` as the active credential. Blank values clear it.
    pub fn save_credential(&self, value: &str) -> Result<LabSnapshot, LabError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return self.clear_credential();
        }
        self.store.set(trimmed)?;
        let mut state = self.state();
        state.credential = trimmed.to_string();
        if let Slot::Error(_) = state.display {
            state.display = Slot::Empty;
        }
        log::info!("gemini credential saved");
        Ok(state.snapshot())
    }

    pub fn clear_credential(&self) -> Result<LabSnapshot, LabError> {
        self.store.clear()?;
        let mut state = self.state();
        state.credential.clear();
        log::info!("gemini credential cleared");
        Ok(state.snapshot())
    }

    /// Switch task mode, clearing the current result and error.
    pub fn set_mode(&self, mode: Mode) -> LabSnapshot {
        let mut state = self.state();
        state.mode = mode;
        state.display = Slot::Empty;
        if let Some(ticket) = state.in_flight.as_mut() {
            ticket.stale = true;
        }
        state.snapshot()
    }

    pub fn set_model(&self, id: &str) -> Result<LabSnapshot, LabError> {
        let model = ModelSelection::new(id)?;
        let mut state = self.state();
        state.model = model;
        Ok(state.snapshot())
    }

    pub fn set_input(&self, input: impl Into<String>) -> LabSnapshot {
        let mut state = self.state();
        state.input = input.into();
        state.snapshot()
    }

    /// Run the current input through the selected mode and model.
    ///
    /// The outcome is returned to the caller even when a newer request has
    /// since claimed the display slot.
    pub async fn execute_task(&self) -> Result<String, LabError> {
        let (credential, request, generation) = {
            let mut state = self.state();
            let credential = match state.require_credential() {
                Ok(credential) => credential,
                Err(err) => return Err(state.reject(err)),
            };
            if state.input.trim().is_empty() {
                return Err(state.reject(LabError::EmptyInput));
            }
            let request = TaskRequest {
                mode: state.mode,
                input: state.input.clone(),
                model: state.model,
            };
            (credential, request, state.begin())
        };
        let pending = InFlight::new(self, generation);

        let prompt = build_prompt(request.mode, &request.input);
        log::info!(
            "dispatching {} task #{generation} to {}",
            request.mode,
            request.model.id()
        );
        let outcome = self
            .client
            .generate_content(&credential, request.model.id(), &prompt)
            .await
            .map(|generated| generated.text)
            .map_err(LabError::from);
        if let Err(err) = &outcome {
            log::warn!("task #{generation} failed: {err}");
        }
        pending.complete(&outcome);
        outcome
    }

    /// Probe which models the stored credential can reach and display them.
    pub async fn list_available_models(&self) -> Result<String, LabError> {
        let (credential, generation) = {
            let mut state = self.state();
            let credential = match state.require_credential() {
                Ok(credential) => credential,
                Err(err) => return Err(state.reject(err)),
            };
            (credential, state.begin())
        };
        let pending = InFlight::new(self, generation);

        let outcome = match self.client.list_models(&credential).await {
            Ok(ModelListing::Models(names)) if !names.is_empty() => Ok(format_listing(&names)),
            Ok(ModelListing::Models(_)) => {
                Err(LabError::ListingUnavailable(LISTING_FALLBACK.to_string()))
            }
            Ok(ModelListing::Error(detail)) => Err(LabError::ListingUnavailable(
                detail.unwrap_or_else(|| LISTING_FALLBACK.to_string()),
            )),
            Err(err) => Err(LabError::ListingFailed(err)),
        };
        if let Err(err) = &outcome {
            log::warn!("model listing #{generation} failed: {err}");
        }
        pending.complete(&outcome);
        outcome
    }

    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the loading flag for one dispatched request and releases it when
/// dropped, including when the request future is cancelled.
struct InFlight<'a> {
    runner: &'a TaskRunner,
    generation: u64,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn new(runner: &'a TaskRunner, generation: u64) -> Self {
        Self {
            runner,
            generation,
            done: false,
        }
    }

    fn complete(mut self, outcome: &Result<String, LabError>) {
        self.release(Some(outcome));
        self.done = true;
    }

    fn release(&self, outcome: Option<&Result<String, LabError>>) {
        let mut state = self.runner.state();
        let ticket = match state.in_flight {
            Some(ticket) if ticket.generation == self.generation => ticket,
            _ => {
                log::debug!("dropping superseded response #{}", self.generation);
                return;
            }
        };
        state.in_flight = None;
        if ticket.stale {
            log::debug!("discarding response #{} after mode change", self.generation);
            return;
        }
        state.display = match outcome {
            Some(Ok(text)) => Slot::Result(text.clone()),
            Some(Err(err)) => Slot::Error(err.to_string()),
            None => Slot::Empty,
        };
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.release(None);
        }
    }
}

fn format_listing(names: &[String]) -> String {
    let names = names
        .iter()
        .map(|name| strip_namespace(name))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{LISTING_HEADER}\n\n{names}")
}
