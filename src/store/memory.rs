//! `memory` store: the set lives in process memory only.

use std::sync::Mutex;

use super::PackSizeStore;
use crate::error::AppError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    sizes: Mutex<Vec<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PackSizeStore for MemoryStore {
    fn store_type(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Result<Vec<u64>, AppError> {
        let sizes = self
            .sizes
            .lock()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))?;
        Ok(sizes.clone())
    }

    fn save(&self, sizes: &[u64]) -> Result<(), AppError> {
        let mut stored = self
            .sizes
            .lock()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))?;
        *stored = sizes.to_vec();
        Ok(())
    }
}
