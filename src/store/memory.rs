use crate::error::Result;
use crate::store::{Registry, Store};

/// Process-local store; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    registry: Registry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Registry) -> Self {
        MemoryStore { registry }
    }
}

impl Store for MemoryStore {
    fn read(&self) -> &Registry {
        &self.registry
    }

    fn write<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Registry) -> Result<T>,
    {
        let mut draft = self.registry.clone();
        let value = f(&mut draft)?;
        self.registry = draft;
        Ok(value)
    }
}
