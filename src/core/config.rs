use crate::core::errors::{FlagDagError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::Path;

/// Configuration for the flag set the barrier parses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSetConfig {
    /// Program name shown in usage output
    pub name: String,
    /// One-line description shown above the options in usage output
    pub about: Option<String>,
    /// Turn off the built-in `--help` flag
    pub disable_help_flag: bool,
}

impl Default for FlagSetConfig {
    fn default() -> Self {
        Self {
            name: default_program_name(),
            about: None,
            disable_help_flag: false,
        }
    }
}

impl FlagSetConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn without_help_flag(mut self) -> Self {
        self.disable_help_flag = true;
        self
    }

    /// Load a config from YAML; missing keys fall back to defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FlagDagError::configuration_field(
                "flag set name must not be empty",
                "name",
            ));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(FlagDagError::configuration_field(
                "flag set name must not contain whitespace",
                "name",
            ));
        }
        Ok(())
    }
}

/// File name of the running binary, or `app` when there is none
fn default_program_name() -> String {
    program_name(std::env::args_os().next().as_deref())
}

fn program_name(arg0: Option<&OsStr>) -> String {
    arg0.map(Path::new)
        .and_then(Path::file_name)
        .and_then(OsStr::to_str)
        .filter(|n| !n.is_empty() && !n.chars().any(char::is_whitespace))
        .map(str::to_string)
        .unwrap_or_else(|| "app".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FlagSetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = FlagSetConfig::new("  ").validate().unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_from_yaml_fills_defaults() {
        let config = FlagSetConfig::from_yaml_str("name: hello\nabout: says hello\n").unwrap();
        assert_eq!(
            config,
            FlagSetConfig::new("hello").with_about("says hello")
        );
    }

    #[test]
    fn test_from_yaml_validates() {
        assert!(FlagSetConfig::from_yaml_str("name: \"two words\"\n").is_err());
    }

    #[test]
    fn test_program_name_from_arg0() {
        assert_eq!(program_name(Some(OsStr::new("/usr/bin/hello"))), "hello");
        assert_eq!(program_name(Some(OsStr::new("my tool"))), "app");
        assert_eq!(program_name(None), "app");
    }

    #[cfg(unix)]
    #[test]
    fn test_program_name_falls_back_on_non_utf8() {
        use std::os::unix::ffi::OsStrExt;
        assert_eq!(program_name(Some(OsStr::from_bytes(b"/bin/\xffx"))), "app");
    }
}
