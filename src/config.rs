use redwire_world::EngineConfig;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "redwire.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine tuning, the `[engine]` table.
    pub engine: EngineConfig,
    /// Print every wire's final power to stdout.
    pub print_wires: bool,
}

impl AppConfig {
    /// Load from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        let config = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    AppConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                AppConfig::default()
            }
        };
        if let Err(err) = config.engine.validate() {
            warn!("Invalid engine settings in {}: {err}. Using defaults", path.display());
            return AppConfig {
                engine: EngineConfig::default(),
                ..config
            };
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redwire_world::StrategyKind;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "redwire-{tag}-{}.toml",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_path("partial");
        fs::write(&path, "print_wires = true\n[engine]\nstrategy = \"graph\"\n").unwrap();
        let config = AppConfig::load_from_path(&path);
        assert!(config.print_wires);
        assert_eq!(config.engine.strategy, StrategyKind::Graph);
        assert_eq!(config.engine.max_update_depth, 512);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_path("malformed");
        fs::write(&path, "[engine\nstrategy = 3").unwrap();
        let config = AppConfig::load_from_path(&path);
        assert_eq!(config.engine, EngineConfig::default());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn invalid_sizes_fall_back_to_default_engine() {
        let path = temp_path("invalid");
        fs::write(&path, "print_wires = true\n[engine]\nmax_network_size = 0\n").unwrap();
        let config = AppConfig::load_from_path(&path);
        assert!(config.print_wires);
        assert_eq!(config.engine, EngineConfig::default());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::load_from_path(Path::new("/nonexistent/redwire.toml"));
        assert!(!config.print_wires);
    }
}
