//! Statement catalogs: where SQL text lives, keyed by statement id.
//!
//! The text is resolved on every execution, so a catalog may change it at
//! runtime:
//! - [`MemoryCatalog`] is replaced through [`MemoryCatalog::insert`]
//! - [`PropertiesCatalog`] re-reads its file when the file changes on disk

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::config::{ConfigError, parse_properties};

/// Lookup of SQL text by statement id.
pub trait StatementCatalog: Send + Sync {
    fn lookup(&self, statement_id: &str) -> Option<String>;
}

/// In-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    statements: RwLock<HashMap<String, String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the SQL text of a statement.
    pub fn insert(&self, statement_id: impl Into<String>, sql: impl Into<String>) {
        self.statements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(statement_id.into(), sql.into());
    }

    pub fn remove(&self, statement_id: &str) -> Option<String> {
        self.statements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(statement_id)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let statements = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            statements: RwLock::new(statements),
        }
    }
}

impl StatementCatalog for MemoryCatalog {
    fn lookup(&self, statement_id: &str) -> Option<String> {
        self.statements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(statement_id)
            .cloned()
    }
}

/// File identity used to detect changes: modification time and length.
type Fingerprint = (Option<SystemTime>, u64);

#[derive(Debug)]
struct LoadedFile {
    fingerprint: Fingerprint,
    statements: HashMap<String, String>,
}

/// Catalog backed by a `key=value` properties file.
#[derive(Debug)]
pub struct PropertiesCatalog {
    path: PathBuf,
    loaded: Mutex<LoadedFile>,
}

impl PropertiesCatalog {
    /// Load the catalog file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let loaded = Self::load(&path)?;
        debug!(
            path = %path.display(),
            statements = loaded.statements.len(),
            "Statement catalog loaded"
        );
        Ok(Self {
            path,
            loaded: Mutex::new(loaded),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fingerprint(path: &Path) -> std::io::Result<Fingerprint> {
        let meta = std::fs::metadata(path)?;
        Ok((meta.modified().ok(), meta.len()))
    }

    fn load(path: &Path) -> Result<LoadedFile, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let fingerprint = Self::fingerprint(path).map_err(io_error)?;
        let text = std::fs::read_to_string(path).map_err(io_error)?;
        Ok(LoadedFile {
            fingerprint,
            statements: parse_properties(&text),
        })
    }

    /// Re-read the file if it changed since the last load.
    ///
    /// If the file cannot be read the previously loaded statements are kept.
    fn refresh(&self, loaded: &mut LoadedFile) {
        match Self::fingerprint(&self.path) {
            Ok(current) if current == loaded.fingerprint => {}
            Ok(_) => match Self::load(&self.path) {
                Ok(fresh) => {
                    debug!(
                        path = %self.path.display(),
                        statements = fresh.statements.len(),
                        "Statement catalog reloaded"
                    );
                    *loaded = fresh;
                }
                Err(e) => warn!(error = %e, "Statement catalog reload failed, keeping previous"),
            },
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Statement catalog unavailable, keeping previous"
            ),
        }
    }
}

impl StatementCatalog for PropertiesCatalog {
    fn lookup(&self, statement_id: &str) -> Option<String> {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        self.refresh(&mut loaded);
        loaded.statements.get(statement_id).cloned()
    }
}
