//! Readiness of the shared inference service.
//!
//! The listener starts before the bundle is loaded; handlers consult the
//! state on every request and refuse work until the load has settled.

use std::sync::{Arc, OnceLock};

use triage_ai::InferenceService;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    outcome: Arc<OnceLock<Result<InferenceService, String>>>,
}

pub enum Readiness<'a> {
    Loading,
    Ready(&'a InferenceService),
    Fatal(&'a str),
}

impl AppState {
    pub fn loading() -> Self {
        Self::default()
    }

    pub fn ready(service: InferenceService) -> Self {
        let state = Self::default();
        state.settle(Ok(service));
        state
    }

    /// Record the load outcome. Only the first call has any effect.
    pub fn settle(&self, outcome: Result<InferenceService, String>) -> bool {
        self.outcome.set(outcome).is_ok()
    }

    pub fn readiness(&self) -> Readiness<'_> {
        match self.outcome.get() {
            None => Readiness::Loading,
            Some(Ok(service)) => Readiness::Ready(service),
            Some(Err(message)) => Readiness::Fatal(message),
        }
    }

    pub fn fatal_error(&self) -> Option<&str> {
        match self.readiness() {
            Readiness::Fatal(message) => Some(message),
            _ => None,
        }
    }
}
