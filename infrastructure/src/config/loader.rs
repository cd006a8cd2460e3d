//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

const APP_DIR: &str = "medreason";
const PROJECT_FILES: [&str; 2] = ["medreason.toml", ".medreason.toml"];
const ENV_PREFIX: &str = "MEDREASON_";

/// Backend override read directly from the environment.
pub const FORCE_BACKEND_ENV: &str = "MEDREASON_FORCE_BACKEND";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment: `MEDREASON_<SECTION>__<KEY>` and `MEDREASON_FORCE_BACKEND`
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./medreason.toml` or `./.medreason.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/medreason/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Self::file_figment(config_path);
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: FileConfig = figment.extract().map_err(Box::new)?;
        if let Ok(value) = std::env::var(FORCE_BACKEND_ENV) {
            config.engine.force_backend = Some(value);
        }
        Ok(config)
    }

    fn file_figment(config_path: Option<&PathBuf>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    /// Effective configuration as TOML (for --show-config)
    pub fn render(config: &FileConfig) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(config)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/medreason/config.toml if set,
    /// otherwise falls back to the platform config directory
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources() {
        println!("Configuration sources (in priority order):");

        let env_vars: Vec<String> = std::env::vars()
            .map(|(k, _)| k)
            .filter(|k| k.starts_with(ENV_PREFIX))
            .collect();
        if env_vars.is_empty() {
            println!("  [     ] Env:     {}*", ENV_PREFIX);
        } else {
            println!("  [FOUND] Env:     {}", env_vars.join(", "));
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./medreason.toml or ./.medreason.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.criteria.active, "qSOFA");
        assert!(config.engine.force_backend.is_none());
    }

    #[test]
    fn test_render_round_trips() {
        let mut config = FileConfig::default();
        config.database.row_cap = 4;
        let rendered = ConfigLoader::render(&config).unwrap();
        assert!(rendered.contains("[database]"));
        let parsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("medreason"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nrow_cap = 3\n[server]\naddr = \"0.0.0.0:9999\"").unwrap();

        let config: FileConfig = ConfigLoader::file_figment(Some(&file.path().to_path_buf()))
            .extract()
            .unwrap();
        assert_eq!(config.database.row_cap, 3);
        assert_eq!(config.server.addr, "0.0.0.0:9999");
        assert_eq!(config.server.progress_poll_ms, 500);
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MEDREASON_DATABASE__ROW_CAP", "7");
            jail.set_env("MEDREASON_FORCE_BACKEND", "vllm");
            let config = ConfigLoader::load(None).map_err(|e| *e)?;
            assert_eq!(config.database.row_cap, 7);
            assert_eq!(config.engine.force_backend.as_deref(), Some("vllm"));
            Ok(())
        });
    }
}
