//! XDG-compliant path resolution for wordlift-sync.
//!
//! The CLI keeps its config in `$XDG_CONFIG_HOME/wordlift-sync/` and the
//! durable content store in `$XDG_DATA_HOME/wordlift-sync/`.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(wl::paths::no_home),
        help("Set the HOME environment variable, or pass `--config` and `--data-dir` explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(wl::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Directories used by the CLI.
#[derive(Debug, Clone)]
pub struct SyncPaths {
    /// `$XDG_CONFIG_HOME/wordlift-sync/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/wordlift-sync/`
    pub data_dir: PathBuf,
}

impl SyncPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("wordlift-sync");

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("wordlift-sync");

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Apply CLI overrides, consulting the environment only for directories
    /// that were not given. Needs no `HOME` when both are given.
    pub fn resolve_with(config_file: Option<PathBuf>, data_dir: Option<PathBuf>) -> PathResult<Self> {
        match (config_file, data_dir) {
            (Some(config_file), Some(data_dir)) => Ok(Self {
                config_dir: config_file.parent().map(PathBuf::from).unwrap_or_default(),
                data_dir,
            }),
            (config_file, data_dir) => Ok(Self::with_overrides(Self::resolve()?, config_file, data_dir)),
        }
    }

    /// Paths rooted at explicit directories (CLI overrides, tests).
    pub fn with_overrides(base: Self, config_file: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        Self {
            config_dir: config_file
                .as_ref()
                .and_then(|f| f.parent().map(PathBuf::from))
                .unwrap_or(base.config_dir),
            data_dir: data_dir.unwrap_or(base.data_dir),
        }
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Directory holding the redb content store.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("content")
    }
}
