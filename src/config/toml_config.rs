use crate::core::languages::Languages;
use crate::utils::error::{GuardError, Result};
use crate::utils::validation::{
    validate_exclusive_lists, validate_extension_mapping, validate_path,
    validate_validator_names, Validate,
};
use crate::validators::validator_names;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_CONFIG_FILE: &str = ".sortguard.toml";

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex is valid"));

/// `.sortguard.toml` 的內容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub extensions: HashMap<String, String>,
    #[serde(default)]
    pub validators: ValidatorsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorsConfig {
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl FileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, &path.as_ref().display().to_string())
    }

    /// Loads `path` if it exists, otherwise returns the default configuration.
    pub fn from_file_if_exists<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            tracing::debug!("Loading configuration from {}", path.as_ref().display());
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, DEFAULT_CONFIG_FILE)
    }

    /// `origin` 為錯誤訊息中顯示的檔案路徑
    fn parse(content: &str, origin: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| GuardError::InvalidConfigValueError {
            field: "toml_parsing".to_string(),
            value: origin.to_string(),
            reason: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HOME})，未定義的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_REGEX
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }
}

impl Validate for FileConfig {
    fn validate(&self) -> Result<()> {
        let supported = Languages::supported_extensions();
        for (key, value) in &self.extensions {
            validate_extension_mapping("extensions", key, value, &supported)?;
        }

        let known = validator_names();
        validate_validator_names("validators.enabled", &self.validators.enabled, &known)?;
        validate_validator_names("validators.disabled", &self.validators.disabled, &known)?;
        validate_exclusive_lists(
            "validators.enabled",
            &self.validators.enabled,
            "validators.disabled",
            &self.validators.disabled,
        )?;

        for path in &self.paths.ignore {
            validate_path("paths.ignore", path)?;
        }
        Ok(())
    }
}
