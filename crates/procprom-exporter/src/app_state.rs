//! Shared application state for the exporter's HTTP surface.

use std::sync::Arc;

use crate::emitter::ProcessEmitter;

#[derive(Clone)]
pub struct AppState {
    emitter: Arc<ProcessEmitter>,
}

impl AppState {
    pub fn new(emitter: Arc<ProcessEmitter>) -> Self {
        Self { emitter }
    }

    pub fn emitter(&self) -> Arc<ProcessEmitter> {
        Arc::clone(&self.emitter)
    }
}
