//! Practice configuration from legaldoc.toml
//!
//! Everything here is optional: a practice without a config file passes
//! template and clause directories on the command line.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "legaldoc.toml";

/// Practice-wide settings from legaldoc.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// Firm name, for display only
    #[serde(default)]
    pub firm_name: Option<String>,

    /// Directory holding the .docx templates
    #[serde(default)]
    pub templates_dir: Option<String>,

    /// Directory searched recursively for clause files
    #[serde(default)]
    pub clauses_dir: Option<String>,

    /// Directory generated documents are written to
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Template file per document type, overriding the profile's default name
    #[serde(default)]
    pub templates: BTreeMap<String, String>,

    /// Profile file per document type, replacing the built-in profile
    #[serde(default)]
    pub profiles: BTreeMap<String, String>,

    /// Field defaults applied beneath client input (e.g. `CLIENT_COUNTY`)
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    /// Directory the file was loaded from; relative paths resolve against it
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl PracticeConfig {
    /// Load configuration from a legaldoc.toml file
    ///
    /// # Parameters
    /// * `path` - Path to the legaldoc.toml configuration file
    ///
    /// # Returns
    /// * `Ok(PracticeConfig)` - Successfully loaded configuration
    /// * `Err(PracticeConfigError)` - Error reading or parsing the configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PracticeConfigError> {
        let content = fs::read_to_string(&path).map_err(PracticeConfigError::IoError)?;

        let mut config: PracticeConfig =
            toml::from_str(&content).map_err(PracticeConfigError::ParseError)?;
        config.base_dir = path.as_ref().parent().map(Path::to_path_buf);

        Ok(config)
    }

    /// Save configuration to a legaldoc.toml file
    ///
    /// # Parameters
    /// * `path` - Path where the legaldoc.toml file will be written
    ///
    /// # Returns
    /// * `Ok(())` - Successfully saved configuration
    /// * `Err(PracticeConfigError)` - Error serializing or writing the configuration file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PracticeConfigError> {
        let content = toml::to_string_pretty(self).map_err(PracticeConfigError::SerializeError)?;

        fs::write(&path, content).map_err(PracticeConfigError::IoError)?;

        Ok(())
    }

    /// Resolve a configured path against the config file's directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.templates_dir.as_deref().map(|p| self.resolve(p))
    }

    pub fn clauses_dir(&self) -> Option<PathBuf> {
        self.clauses_dir.as_deref().map(|p| self.resolve(p))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_deref().map(|p| self.resolve(p))
    }

    /// Template override for a document type
    pub fn template_for(&self, profile_id: &str) -> Option<PathBuf> {
        self.templates.get(profile_id).map(|p| self.resolve(p))
    }

    /// Profile file override for a document type
    pub fn profile_for(&self, profile_id: &str) -> Option<PathBuf> {
        self.profiles.get(profile_id).map(|p| self.resolve(p))
    }
}

/// Errors that can occur when loading or saving practice configuration
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum PracticeConfigError {
    /// IO error when reading or writing file
    IoError(std::io::Error),

    /// Error parsing TOML
    ParseError(toml::de::Error),

    /// Error serializing to TOML
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for PracticeConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PracticeConfigError::IoError(e) => write!(f, "IO error: {}", e),
            PracticeConfigError::ParseError(e) => write!(f, "TOML parse error: {}", e),
            PracticeConfigError::SerializeError(e) => write!(f, "TOML serialize error: {}", e),
        }
    }
}

impl std::error::Error for PracticeConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_practice_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = PracticeConfig {
            firm_name: Some("Maury Estate Law".to_string()),
            templates_dir: Some("templates".to_string()),
            clauses_dir: Some("/srv/clauses".to_string()),
            ..PracticeConfig::default()
        };
        config
            .templates
            .insert("will".to_string(), "Simple_Will.docx".to_string());
        config
            .defaults
            .insert("CLIENT_COUNTY".to_string(), "Williamson".to_string());

        config.save(&path).unwrap();
        let loaded = PracticeConfig::load(&path).unwrap();

        assert_eq!(loaded.firm_name.as_deref(), Some("Maury Estate Law"));
        assert_eq!(loaded.templates_dir(), Some(dir.path().join("templates")));
        assert_eq!(loaded.clauses_dir(), Some(PathBuf::from("/srv/clauses")));
        assert_eq!(
            loaded.template_for("will"),
            Some(dir.path().join("Simple_Will.docx"))
        );
        assert_eq!(loaded.defaults["CLIENT_COUNTY"], "Williamson");
        assert!(loaded.output_dir().is_none());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "templates_dir = [").unwrap();

        let err = PracticeConfig::load(&path).unwrap_err();
        assert!(matches!(err, PracticeConfigError::ParseError(_)));
    }
}
