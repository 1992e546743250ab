//! Server state shared across handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::batch::{BatchGenerator, HandleRegistry};
use crate::font::FontBook;

/// Application state shared across handlers.
pub struct AppState {
    /// One batch at a time; a new batch replaces the previous artifacts.
    pub generator: Mutex<BatchGenerator>,
    /// Live artifact handles, shared with the generator.
    pub registry: HandleRegistry,
}

impl AppState {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        let registry = HandleRegistry::new();
        let generator = BatchGenerator::new(fonts).with_registry(registry.clone());
        Self {
            generator: Mutex::new(generator),
            registry,
        }
    }
}
