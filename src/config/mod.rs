pub mod cli;
pub mod toml_config;

use crate::core::languages::Languages;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_exclusive_lists, validate_extension_mapping, validate_path,
    validate_validator_names, Validate,
};
use crate::validators::validator_names;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use toml_config::FileConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "sortguard")]
#[command(about = "Validates blocks of code marked with <block> tags in comments")]
#[command(
    long_about = "Validates blocks of code marked with <block> tags in comments.\n\n\
    Without a command, reads a unified diff (`git diff --patch`) from stdin and checks \
    the blocks touched by it."
)]
pub struct CliConfig {
    /// Maps a file extension to a supported one, e.g. `-E cxx=cpp`
    #[arg(short = 'E', long = "extension", value_name = "KEY=VALUE", value_parser = parse_key_val, action = ArgAction::Append, global = true)]
    pub extensions: Vec<(String, String)>,

    /// Disables a validator
    #[arg(short = 'd', long = "disable", value_name = "VALIDATOR", action = ArgAction::Append, global = true)]
    pub disable: Vec<String>,

    /// Runs only the given validators
    #[arg(short = 'e', long = "enable", value_name = "VALIDATOR", action = ArgAction::Append, global = true)]
    pub enable: Vec<String>,

    /// Sorts unsorted keep-sorted blocks in place
    #[arg(long, global = true)]
    pub fix: bool,

    /// Configuration file, `.sortguard.toml` in the root by default
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output", global = true)]
    pub verbose: bool,

    /// Logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
pub enum Command {
    /// Checks every block in the given files and directories
    Check(PathArgs),
    /// Lists the blocks in the given files and directories as JSON
    List(PathArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct PathArgs {
    #[arg(default_value = ".")]
    pub paths: Vec<String>,

    /// Skips a file or directory
    #[arg(long, value_name = "PATH", action = ArgAction::Append)]
    pub ignore: Vec<String>,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return Err(format!("invalid KEY=VALUE: `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

impl CliConfig {
    pub fn ignore(&self) -> &[String] {
        match &self.command {
            Some(Command::Check(args)) | Some(Command::List(args)) => &args.ignore,
            None => &[],
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let supported = Languages::supported_extensions();
        for (key, value) in &self.extensions {
            validate_extension_mapping("--extension", key, value, &supported)?;
        }
        let known = validator_names();
        validate_validator_names("--enable", &self.enable, &known)?;
        validate_validator_names("--disable", &self.disable, &known)?;
        validate_exclusive_lists("--enable", &self.enable, "--disable", &self.disable)?;
        if let Some(path) = &self.config {
            validate_path("--config", path)?;
        }
        for path in self.ignore() {
            validate_path("--ignore", path)?;
        }
        Ok(())
    }
}

/// Effective settings: the configuration file with the command line on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub extensions: HashMap<String, String>,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub ignore: Vec<String>,
    pub fix: bool,
}

impl Settings {
    /// Extension mappings of the command line override the file's, lists extend.
    pub fn merge(file: FileConfig, cli: &CliConfig) -> Self {
        let mut extensions = file.extensions;
        extensions.extend(cli.extensions.iter().cloned());

        let mut enabled = file.validators.enabled;
        enabled.extend(cli.enable.iter().cloned());
        let mut disabled = file.validators.disabled;
        disabled.extend(cli.disable.iter().cloned());
        let mut ignore = file.paths.ignore;
        ignore.extend(cli.ignore().iter().cloned());

        Self {
            extensions,
            enabled,
            disabled,
            ignore,
            fix: cli.fix,
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        let supported = Languages::supported_extensions();
        for (key, value) in &self.extensions {
            validate_extension_mapping("extensions", key, value, &supported)?;
        }
        let known = validator_names();
        validate_validator_names("enabled", &self.enabled, &known)?;
        validate_validator_names("disabled", &self.disabled, &known)?;
        validate_exclusive_lists("enabled", &self.enabled, "disabled", &self.disabled)?;
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn extensions(&self) -> &HashMap<String, String> {
        &self.extensions
    }

    fn enabled_validators(&self) -> &[String] {
        &self.enabled
    }

    fn disabled_validators(&self) -> &[String] {
        &self.disabled
    }

    fn ignore_paths(&self) -> &[String] {
        &self.ignore
    }

    fn fix(&self) -> bool {
        self.fix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_diff_mode_flags() {
        let config = CliConfig::try_parse_from([
            "sortguard",
            "-E",
            "cxx=cpp",
            "--extension",
            "python=py",
            "-d",
            "line-count",
            "--fix",
            "-v",
        ])
        .unwrap();

        assert_eq!(
            config.extensions,
            vec![
                ("cxx".to_string(), "cpp".to_string()),
                ("python".to_string(), "py".to_string())
            ]
        );
        assert_eq!(config.disable, vec!["line-count"]);
        assert!(config.fix);
        assert!(config.verbose);
        assert!(config.command.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_check_command() {
        let config = CliConfig::try_parse_from([
            "sortguard", "check", "src", "README.md", "--ignore", "src/gen", "-e", "keep-sorted",
        ])
        .unwrap();

        let Some(Command::Check(args)) = &config.command else {
            panic!("expected check command");
        };
        assert_eq!(args.paths, vec!["src", "README.md"]);
        assert_eq!(config.ignore(), ["src/gen".to_string()]);
        assert_eq!(config.enable, vec!["keep-sorted"]);
    }

    #[test]
    fn test_list_defaults_to_current_directory() {
        let config = CliConfig::try_parse_from(["sortguard", "list"]).unwrap();
        let Some(Command::List(args)) = &config.command else {
            panic!("expected list command");
        };
        assert_eq!(args.paths, vec!["."]);
    }

    #[test]
    fn test_invalid_extension_flag() {
        assert!(CliConfig::try_parse_from(["sortguard", "-E", "cxx"]).is_err());
        assert!(CliConfig::try_parse_from(["sortguard", "-E", "=cpp"]).is_err());

        let unsupported = CliConfig::try_parse_from(["sortguard", "-E", "x=cobol"]).unwrap();
        assert!(unsupported.validate().is_err());
    }

    #[test]
    fn test_enable_and_disable_are_exclusive() {
        let config =
            CliConfig::try_parse_from(["sortguard", "-e", "affects", "-d", "keep-sorted"]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_settings() {
        let file = FileConfig::from_toml_str(
            "[extensions]\ncxx = \"c\"\n[validators]\ndisabled = [\"affects\"]\n[paths]\nignore = [\"vendor\"]\n",
        )
        .unwrap();
        let cli = CliConfig::try_parse_from([
            "sortguard", "-E", "cxx=cpp", "-d", "line-count", "check", "--ignore", "build",
        ])
        .unwrap();

        let settings = Settings::merge(file, &cli);

        assert_eq!(settings.extensions["cxx"], "cpp");
        assert_eq!(settings.disabled, vec!["affects", "line-count"]);
        assert_eq!(settings.ignore, vec!["vendor", "build"]);
        assert!(!settings.fix);
        assert!(settings.validate().is_ok());
    }
}
