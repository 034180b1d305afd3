use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct ThemeConfig {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError {
        message: format!("failed to read config {}: {}", path.display(), err),
    })?;
    toml::from_str(&text).map_err(|err| ConfigError {
        message: format!("failed to parse config {}: {}", path.display(), err),
    })
}

pub fn resolve_theme(config: &Config) -> Theme {
    // A configured variable prefix re-keys every lookup, so the unprefixed
    // defaults no longer apply and the config supplies the full value set.
    let mut theme = match &config.theme.prefix {
        Some(prefix) => Theme::with_prefix(prefix),
        None => Theme::default_theme(),
    };
    theme.extend(&config.theme.values);
    theme
}

#[cfg(test)]
mod tests {
    use super::{load, resolve_theme, Config};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn loads_toml_config() {
        let path = temp_path("cinder_config");
        let _ = fs::write(&path, "prefix = \"tw\"\nimportant = true");
        let config = load(&path).expect("config should parse");
        assert_eq!(config.prefix.as_deref(), Some("tw"));
        assert!(config.important);
    }

    #[test]
    fn defaults_when_empty() {
        let path = temp_path("cinder_config_default");
        let _ = fs::write(&path, "");
        let config = load(&path).expect("config should parse");
        assert_eq!(config, Config::default());
        assert!(!config.important);
        assert!(config.prefix.is_none());
    }

    #[test]
    fn loads_theme_value_overrides() {
        let path = temp_path("cinder_config_theme");
        let _ = fs::write(
            &path,
            r##"
[theme.values]
"--spacing" = "0.5rem"
"--color-brand-500" = "#336699"
"##,
        );
        let config = load(&path).expect("config should parse");
        let theme = resolve_theme(&config);
        assert_eq!(theme.get("--spacing"), Some("0.5rem"));
        assert_eq!(theme.get("--color-brand-500"), Some("#336699"));
        assert_eq!(theme.get("--breakpoint-md"), Some("48rem"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let path = temp_path("cinder_config_bad");
        let _ = fs::write(&path, "prefix = [");
        let err = load(&path).expect_err("config should fail");
        assert!(err.message.contains("failed to parse config"));
    }

    fn temp_path(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}.toml", prefix, nanos))
    }
}
