//! API shared state

use std::sync::Arc;

use crate::registry::Registry;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Registry owning every periodic probe
    pub registry: Arc<Registry>,
}

impl ApiState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}
