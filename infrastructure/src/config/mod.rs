//! Configuration file loading for medreason
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `MEDREASON_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./medreason.toml` or `./.medreason.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/medreason/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    DEFAULT_REASONING_MODEL, DEFAULT_SQL_MODEL, FileConfig, FileCriteriaConfig,
    FileDatabaseConfig, FileEngineConfig, FileEngineProcessConfig, FileEnginesConfig,
    FileLoggingConfig, FileModelsConfig, FileReasoningConfig, FileServerConfig,
};
pub use loader::{ConfigLoader, FORCE_BACKEND_ENV};
