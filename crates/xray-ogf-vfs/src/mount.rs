//! File-system collaborators for the model decoder

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use xray_ogf_parsers::FileSystem;

use crate::config::FsConfig;
use crate::path::{glob_match, join_paths, normalize_path, path_key, split_alias};

/// Result type for file-system operations
pub type VfsResult<T> = Result<T, VfsError>;

/// File-system errors
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Unknown alias: ${0}$")]
    UnknownAlias(String),

    #[error("Alias ${0}$ refers back to itself")]
    AliasCycle(String),

    #[error("Invalid configuration at line {line}: {message}")]
    InvalidConfig { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Files on disk, addressed by plain paths or `$alias$` prefixes
pub struct NativeFileSystem {
    /// Folder for plain relative paths
    root: PathBuf,
    /// Lower-cased alias name to resolved folder
    aliases: RwLock<HashMap<String, PathBuf>>,
}

impl NativeFileSystem {
    /// File system without aliases; relative paths resolve against `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            aliases: RwLock::new(HashMap::new()),
        }
    }

    /// File system with every alias of `config` resolved up front
    pub fn from_config(root: impl AsRef<Path>, config: &FsConfig) -> VfsResult<Self> {
        let fs = Self::new(root);
        *fs.aliases.write() = config.resolve_all()?;
        Ok(fs)
    }

    /// Register or replace one alias
    pub fn add_alias(&self, name: &str, folder: impl AsRef<Path>) {
        self.aliases
            .write()
            .insert(name.to_ascii_lowercase(), folder.as_ref().to_path_buf());
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.read().len()
    }

    fn alias_folder(&self, alias: &str) -> Option<PathBuf> {
        self.aliases.read().get(&alias.to_ascii_lowercase()).cloned()
    }

    /// Absolute location of an engine path
    pub fn locate(&self, path: &str) -> VfsResult<PathBuf> {
        match split_alias(path) {
            Some((alias, rest)) => {
                let folder = self
                    .alias_folder(alias)
                    .ok_or_else(|| VfsError::UnknownAlias(alias.to_string()))?;
                Ok(folder.join(normalize_path(rest)))
            }
            None => {
                let normalized = normalize_path(path);
                let native = PathBuf::from(&normalized);
                if native.is_absolute() {
                    Ok(native)
                } else {
                    Ok(self.root.join(normalized))
                }
            }
        }
    }

    pub fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        let location = self.locate(path)?;
        if !location.is_file() {
            return Err(VfsError::PathNotFound { path: path.to_string() });
        }
        Ok(std::fs::read(location)?)
    }
}

impl FileSystem for NativeFileSystem {
    fn resolve_path(&self, alias: &str, relative: &str) -> Option<String> {
        let folder = self.alias_folder(alias)?;
        Some(folder.join(normalize_path(relative)).to_string_lossy().into_owned())
    }

    fn open_read(&self, path: &str) -> Option<Vec<u8>> {
        self.read(path).ok()
    }
}

/// In-memory file table with case-insensitive paths
#[derive(Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<String, Vec<u8>>>,
    aliases: RwLock<HashMap<String, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.write().insert(path_key(path), data.into());
    }

    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.write().remove(&path_key(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.read().contains_key(&path_key(path))
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Map `$alias$` onto a folder of this table
    pub fn add_alias(&self, name: &str, folder: &str) {
        self.aliases
            .write()
            .insert(name.to_ascii_lowercase(), normalize_path(folder));
    }

    /// Stored paths matching a glob pattern, sorted
    pub fn find(&self, pattern: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .files
            .read()
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        found.sort();
        found
    }

    fn key(&self, path: &str) -> Option<String> {
        match split_alias(path) {
            Some((alias, rest)) => {
                let aliases = self.aliases.read();
                let folder = aliases.get(&alias.to_ascii_lowercase())?;
                Some(path_key(&join_paths(folder, rest)))
            }
            None => Some(path_key(path)),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn resolve_path(&self, alias: &str, relative: &str) -> Option<String> {
        let aliases = self.aliases.read();
        let folder = aliases.get(&alias.to_ascii_lowercase())?;
        Some(join_paths(folder, relative))
    }

    fn open_read(&self, path: &str) -> Option<Vec<u8>> {
        let key = self.key(path)?;
        self.files.read().get(&key).cloned()
    }
}
