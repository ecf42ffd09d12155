use std::{
    fs, io,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

/// File name of the persisted configuration when it lives beside the executable.
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed configuration {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write configuration {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot locate the executable directory: {0}")]
    ExecutableDir(io::Error),
}

/// The selected key files.
///
/// On disk this is a flat JSON object. The field names `pem_path` and
/// `private_key` are what existing installations already have, so they are
/// kept; the camel-case names are accepted when reading. Empty strings read
/// back as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(
        rename = "pem_path",
        alias = "publicKeyPath",
        default,
        deserialize_with = "non_empty_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_key_path: Option<PathBuf>,
    #[serde(
        rename = "private_key",
        alias = "privateKeyPath",
        default,
        deserialize_with = "non_empty_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_key_path: Option<PathBuf>,
}

impl Configuration {
    pub fn new(public_key_path: impl Into<PathBuf>, private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            public_key_path: Some(public_key_path.into()),
            private_key_path: Some(private_key_path.into()),
        }
    }

    pub fn public_key_path(&self) -> Option<&Path> {
        self.public_key_path.as_deref()
    }

    pub fn private_key_path(&self) -> Option<&Path> {
        self.private_key_path.as_deref()
    }

    /// Both paths are set and both files currently exist.
    pub fn is_complete(&self) -> bool {
        let exists = |path: Option<&Path>| path.is_some_and(Path::exists);
        exists(self.public_key_path()) && exists(self.private_key_path())
    }
}

fn non_empty_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|path| !path.is_empty()).map(PathBuf::from))
}

/// Durable home of the [`Configuration`].
///
/// Nothing is cached: every [`load`](Self::load) goes to disk, so a save is
/// visible to the very next request. Saves replace the file through a rename,
/// so a concurrent load sees either the old or the new content, never a mix.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `config.json` in the directory of the running executable.
    pub fn beside_executable() -> Result<Self, ConfigError> {
        let exe = std::env::current_exe().map_err(ConfigError::ExecutableDir)?;
        let dir = exe.parent().ok_or_else(|| {
            ConfigError::ExecutableDir(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} has no parent directory", exe.display()),
            ))
        })?;
        Ok(Self::new(dir.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty configuration, not an error.
    pub fn load(&self) -> Result<Configuration, ConfigError> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no configuration file yet");
                return Ok(Configuration::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&contents).map_err(|source| ConfigError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrites the whole file with `config`.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_error)?;

        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        serde_json::to_writer(&mut staged, config).map_err(|e| write_error(e.into()))?;
        staged.flush().map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged.persist(&self.path).map_err(|e| write_error(e.error))?;

        debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}
