//! Storage backends for the policy document

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::{StoreError, StoreResult};

/// Raw storage for the serialized policy document
pub trait PolicyBackend: Send + Sync {
    /// Read the stored document, `None` if nothing has been written yet
    fn read(&self) -> StoreResult<Option<String>>;

    /// Replace the stored document
    fn write(&self, contents: &str) -> StoreResult<()>;

    /// Human-readable location, used in errors and logs
    fn location(&self) -> String;
}

/// Policy document kept in a JSON file on disk
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "policy.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PolicyBackend for JsonFileBackend {
    fn read(&self) -> StoreResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, contents: &str) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Readers see either the old or the new file, never a partial one
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        debug!(path = %self.path.display(), bytes = contents.len(), "Policy written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend for tests and ephemeral daemons
#[derive(Debug, Default)]
pub struct MemoryBackend {
    contents: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with raw contents already "on disk"
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    /// Raw contents as last written
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl PolicyBackend for MemoryBackend {
    fn read(&self) -> StoreResult<Option<String>> {
        let contents = self
            .contents
            .lock()
            .map_err(|_| StoreError::Io(io::Error::other("memory backend lock poisoned")))?;
        Ok(contents.clone())
    }

    fn write(&self, contents: &str) -> StoreResult<()> {
        let mut stored = self
            .contents
            .lock()
            .map_err(|_| StoreError::Io(io::Error::other("memory backend lock poisoned")))?;
        *stored = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".into()
    }
}

impl<B: PolicyBackend + ?Sized> PolicyBackend for std::sync::Arc<B> {
    fn read(&self) -> StoreResult<Option<String>> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> StoreResult<()> {
        (**self).write(contents)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
