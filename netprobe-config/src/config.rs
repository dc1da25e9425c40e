use serde::de::DeserializeOwned;
use std::{fs, path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub trait Configurable {
    fn config(&self) -> &serde_yaml::Value;

    // read configuration from yaml config
    fn load_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<serde_yaml::Value, ConfigError> {
        let content: String = fs::read_to_string(config_file_path)?;
        let config: serde_yaml::Value = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Extract Value from config using dot notation i.e. "probe.echo.timeout"
    fn get_config_value(&self, key: &str) -> Option<&serde_yaml::Value> {
        let keys: Vec<&str> = key.split('.').collect();
        Self::get_value_recursive(self.config(), &keys)
    }

    fn get_value_recursive<'a>(
        config: &'a serde_yaml::Value,
        keys: &[&str],
    ) -> Option<&'a serde_yaml::Value> {
        if keys.is_empty() {
            return None;
        };

        match config {
            serde_yaml::Value::Mapping(map) => {
                let key = keys[0];
                let remaining_keys = &keys[1..];

                if let Some(value) =
                    map.get(serde_yaml::Value::String(key.to_string()))
                {
                    if remaining_keys.is_empty() {
                        Some(value)
                    } else {
                        Self::get_value_recursive(value, remaining_keys)
                    }
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Deserialize the section under `key` into `T`.
    ///
    /// A missing section (or an explicit `null`) yields `T::default()`.
    fn get_section<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.get_config_value(key) {
            None | Some(serde_yaml::Value::Null) => Ok(T::default()),
            Some(value) => Ok(serde_yaml::from_value(value.clone())?),
        }
    }
}

/// Configuration read from a single YAML document.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    config: serde_yaml::Value,
}

impl Configurable for FileConfig {
    fn config(&self) -> &serde_yaml::Value {
        &self.config
    }
}

impl FileConfig {
    pub fn from_path(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<Self, ConfigError> {
        let path = config_file_path.as_ref();
        tracing::debug!("Loading configuration from {}", path.display());
        Ok(Self {
            config: Self::load_config(path)?,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            config: serde_yaml::from_str(content)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, Default, serde::Deserialize, PartialEq)]
    struct Section {
        #[serde(default)]
        setting: u64,
    }

    #[test]
    fn test_load_config() {
        let app = FileConfig::from_path("../netprobe.example.yml").unwrap();

        assert_eq!(
            app.config()["probe"]["address"].as_str(),
            Some("www.taobao.com")
        );
        assert_eq!(app.config()["monitor"]["interval"].as_u64(), Some(30));
    }

    #[test]
    fn test_load_config_valid_yaml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "key: value\napp:\n  setting: 42").unwrap();

        let config = FileConfig::load_config(&config_path);
        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config["key"].as_str(), Some("value"));
        assert_eq!(config["app"]["setting"].as_i64(), Some(42));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "invalid: : yaml: content").unwrap();

        let config = FileConfig::load_config(&config_path);
        assert!(matches!(config, Err(ConfigError::YamlParse(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempdir().unwrap();
        let config = FileConfig::from_path(dir.path().join("absent.yml"));
        assert!(matches!(config, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_get_config_value_empty_keys() {
        let app = FileConfig::from_yaml("probe:\n  address: a").unwrap();
        assert_eq!(app.get_config_value(""), None);
    }

    #[test]
    fn test_get_config_value_recursive() {
        let yaml = r#"
        app:
          nested:
            value: 42
        "#;
        let app = FileConfig::from_yaml(yaml).unwrap();

        assert_eq!(
            app.get_config_value("app.nested.value")
                .and_then(|v| v.as_i64()),
            Some(42)
        );
        assert_eq!(app.get_config_value("app.missing.value"), None);
        assert_eq!(app.get_config_value("missing"), None);
    }

    #[test]
    fn test_get_section() {
        let app = FileConfig::from_yaml("app:\n  setting: 7\nempty:\n").unwrap();

        let section: Section = app.get_section("app").unwrap();
        assert_eq!(section, Section { setting: 7 });

        let missing: Section = app.get_section("nope").unwrap();
        assert_eq!(missing, Section::default());

        let empty: Section = app.get_section("empty").unwrap();
        assert_eq!(empty, Section::default());
    }

    #[test]
    fn test_get_section_wrong_type() {
        let app = FileConfig::from_yaml("app:\n  setting: not-a-number").unwrap();
        let section: Result<Section, _> = app.get_section("app");
        assert!(matches!(section, Err(ConfigError::YamlParse(_))));
    }
}
