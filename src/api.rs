//! HTTP API for the trifecta gate.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::gate::Gate;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
}

impl AppState {
    pub fn new(gate: Gate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}
