use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::errors;

/// Destination of finished metrics documents.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;
    fn publish(&self, document: Arc<str>) -> errors::Result<()>;
}

/// The most recently published document, shared between the poller and readers.
///
/// Publishing swaps the whole document; readers get a reference to a complete
/// one and never hold the lock while using it.
#[derive(Clone, Debug)]
pub struct SharedDocument {
    current: Arc<RwLock<Arc<str>>>,
}

impl Default for SharedDocument {
    fn default() -> Self {
        SharedDocument {
            current: Arc::new(RwLock::new(Arc::from(""))),
        }
    }
}

impl SharedDocument {
    pub fn new() -> SharedDocument {
        SharedDocument::default()
    }

    pub fn current(&self) -> Arc<str> {
        match self.current.read() {
            Ok(doc) => doc.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, document: Arc<str>) {
        match self.current.write() {
            Ok(mut doc) => *doc = document,
            Err(poisoned) => *poisoned.into_inner() = document,
        }
    }
}

impl Sink for SharedDocument {
    fn name(&self) -> &str {
        "memory"
    }

    fn publish(&self, document: Arc<str>) -> errors::Result<()> {
        self.replace(document);
        Ok(())
    }
}

/// Keeps a file on disk in sync with the latest document.
///
/// Each document goes to a temporary file next to the target which is then
/// renamed over it, so readers of the path see either the old or the new file.
#[derive(Clone, Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: PathBuf) -> FileSink {
        FileSink { path }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn publish(&self, document: Arc<str>) -> errors::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(self.dir())?;
        tmp.write_all(document.as_bytes())?;
        tmp.flush()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
