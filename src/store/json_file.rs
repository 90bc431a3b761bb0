use crate::error::{AgendaError, Result};
use crate::store::rows::Snapshot;
use crate::store::{Registry, Store};
use std::fs;
use std::path::{Path, PathBuf};

/// Store backed by a single JSON document on disk.
///
/// Each successful write rewrites the whole document through a temporary
/// sibling file and a rename, so the file on disk is always either the old
/// or the new state.
///
/// The store assumes a single owning process. It keeps the document as last
/// read or written and refuses to commit when the file no longer matches it,
/// so a concurrent writer causes an error instead of a lost update. The
/// check and the rename are not atomic with respect to other processes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    registry: Registry,
    /// Document on disk as of the last open or commit; `None` when absent.
    on_disk: Option<String>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let on_disk = Self::read_document(&path)?;
        let registry = match &on_disk {
            Some(content) => serde_json::from_str::<Snapshot>(content)?.into_registry()?,
            None => Registry::new(),
        };

        tracing::debug!(
            "Opened agenda file {} ({} patients, {} doctors, {} appointments)",
            path.display(),
            registry.patients().count(),
            registry.doctors().count(),
            registry.appointments().count()
        );

        Ok(JsonFileStore {
            path,
            registry,
            on_disk,
        })
    }

    fn read_document(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&mut self, registry: &Registry) -> Result<()> {
        if Self::read_document(&self.path)? != self.on_disk {
            tracing::warn!("{} changed since it was opened", self.path.display());
            return Err(AgendaError::storage(format!(
                "{} was modified by another process; reopen it before writing",
                self.path.display()
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_string_pretty(&Snapshot::from_registry(registry))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &self.path)?;
        self.on_disk = Some(data);

        tracing::debug!("Committed agenda to {}", self.path.display());
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn read(&self) -> &Registry {
        &self.registry
    }

    fn write<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Registry) -> Result<T>,
    {
        let mut draft = self.registry.clone();
        let value = f(&mut draft)?;
        self.persist(&draft)?;
        self.registry = draft;
        Ok(value)
    }
}
