//! Cache configuration.
//!
//! The cache has very little to configure: the pixel budget, the directory
//! that relative image names are resolved against, and how many leading
//! bytes are handed to format predicates. Configuration can be loaded from a
//! TOML file, environment variables, or created programmatically.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of header bytes read from a file for format detection.
pub const DEFAULT_HEADER_PROBE_SIZE: usize = 64;

/// Configuration for a [`SharedImageCache`](crate::SharedImageCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Budget for decoded pixels, measured in pixel area (width * height).
    /// `0` means unlimited.
    pub memory_limit: usize,
    /// Directory prepended to relative image names when reading from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<PathBuf>,
    /// Number of leading bytes passed to format predicates
    pub header_probe_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_limit: 0,
            root_directory: None,
            header_probe_size: DEFAULT_HEADER_PROBE_SIZE,
        }
    }
}

impl CacheConfig {
    /// Sets the pixel budget (0 = unlimited).
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = limit;
        self
    }

    /// Sets the directory relative names are resolved against.
    pub fn with_root_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.root_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the header probe size. Values below 1 are clamped to 1.
    pub fn with_header_probe_size(mut self, size: usize) -> Self {
        self.header_probe_size = size.max(1);
        self
    }

    /// Returns the default location of the configuration file.
    ///
    /// - macOS: ~/Library/Application Support/sharedimg/cache.toml
    /// - Linux: ~/.config/sharedimg/cache.toml
    /// - Windows: %APPDATA%\sharedimg\cache.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("sharedimg").join("cache.toml")
        } else {
            PathBuf::from("sharedimg-cache.toml")
        }
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `SHARED_IMAGE_CACHE_LIMIT`: pixel budget (default: 0, unlimited)
    /// - `SHARED_IMAGE_ROOT`: root directory for relative names
    /// - `SHARED_IMAGE_PROBE_SIZE`: header probe size in bytes (default: 64)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SHARED_IMAGE_CACHE_LIMIT") {
            config.memory_limit = val
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("SHARED_IMAGE_CACHE_LIMIT".to_string()))?;
        }

        if let Ok(val) = std::env::var("SHARED_IMAGE_ROOT") {
            if !val.is_empty() {
                config.root_directory = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("SHARED_IMAGE_PROBE_SIZE") {
            config.header_probe_size = parse_probe_size(&val)
                .ok_or_else(|| ConfigError::InvalidValue("SHARED_IMAGE_PROBE_SIZE".to_string()))?;
        }

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format:
    /// ```toml
    /// memory_limit = 4194304
    /// root_directory = "/usr/share/pixmaps"
    /// header_probe_size = 64
    /// ```
    ///
    /// Missing keys keep their default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        if config.header_probe_size == 0 {
            return Err(ConfigError::InvalidValue("header_probe_size".to_string()));
        }
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let toml = toml::to_string(self)?;
        fs::write(path, toml)?;
        Ok(())
    }

    /// Resolves an image name to a filesystem path.
    ///
    /// Absolute names are used verbatim; relative names are joined onto the
    /// root directory when one is configured.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        match &self.root_directory {
            Some(root) if !path.is_absolute() && !root.as_os_str().is_empty() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn parse_probe_size(val: &str) -> Option<usize> {
    val.trim().parse::<usize>().ok().filter(|size| *size > 0)
}
