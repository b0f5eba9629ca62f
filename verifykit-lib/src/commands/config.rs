use super::Result;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

const LOG_TARGET: &str = "    config";

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// File name searched for when no configuration path is given
pub const CONFIG_FILE_NAME: &str = "verifykit.toml";

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Metrics package directory used when a command is not given one
    #[serde(default)]
    pub metrics_package: Option<Utf8PathBuf>,

    /// Tags a specification must all carry to be reported, unless tags are given on the command line
    #[serde(default)]
    pub spec_tags: Vec<String>,

    /// Whether to report specifications whose measurement is unavailable
    #[serde(default = "default_show_unavailable")]
    pub show_unavailable: bool,
}

const fn default_show_unavailable() -> bool {
    true
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading verifykit configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!(target: LOG_TARGET, "No '{path}' found, using the default configuration");
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading verifykit configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(tag) = self.spec_tags.iter().find(|tag| tag.trim().is_empty()) {
            return Err(app_err!("spec_tags cannot contain empty tags, got '{tag}'"));
        }

        if self.metrics_package.as_ref().is_some_and(|p| p.as_str().is_empty()) {
            return Err(app_err!("metrics_package cannot be an empty path"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(config.metrics_package.is_none());
        assert!(config.spec_tags.is_empty());
        assert!(config.show_unavailable);
    }

    #[test]
    fn test_validate_empty_tag() {
        let config = Config {
            spec_tags: vec!["srd".to_string(), " ".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_package() {
        let config = Config {
            metrics_package: Some(Utf8PathBuf::new()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_save_default_and_load() {
        let (_tmp, root) = temp_root();
        let output_path = root.join(CONFIG_FILE_NAME);
        Config::save_default(&output_path).unwrap();

        let loaded = Config::load(&root, Some(&output_path)).unwrap();
        loaded.validate().unwrap();
        assert!(loaded.show_unavailable);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_found_in_base_dir() {
        let (_tmp, root) = temp_root();
        fs::write(root.join(CONFIG_FILE_NAME), "metrics_package = \"pkg\"\nspec_tags = [\"srd\"]\n").unwrap();

        let config = Config::load(&root, None).unwrap();
        assert_eq!(config.metrics_package.unwrap(), "pkg");
        assert_eq!(config.spec_tags, ["srd"]);
        assert!(config.show_unavailable);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_missing_config_uses_defaults() {
        let (_tmp, root) = temp_root();
        let config = Config::load(&root, None).unwrap();
        config.validate().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_unknown_field_is_rejected() {
        let (_tmp, root) = temp_root();
        let path = root.join("bad.toml");
        fs::write(&path, "unknown_field = 1\n").unwrap();
        assert!(Config::load(&root, Some(&path)).is_err());
    }

    #[test]
    fn test_default_config_matches_embedded() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(toml::to_string(&parsed).unwrap(), toml::to_string(&Config::default()).unwrap());
    }
}
