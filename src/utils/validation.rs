use crate::utils::error::{GuardError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(GuardError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(GuardError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GuardError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 檢查副檔名對應的目標語言是否支援
pub fn validate_extension_mapping(
    field_name: &str,
    key: &str,
    value: &str,
    supported_extensions: &HashSet<&str>,
) -> Result<()> {
    validate_non_empty_string(field_name, key)?;
    if !supported_extensions.contains(value) {
        return Err(GuardError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}={}", key, value),
            reason: format!("Unsupported extension: {}", value),
        });
    }
    Ok(())
}

/// 檢查驗證器名稱是否存在
pub fn validate_validator_names(
    field_name: &str,
    names: &[String],
    known_validators: &[&str],
) -> Result<()> {
    for name in names {
        if !known_validators.contains(&name.as_str()) {
            return Err(GuardError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: name.clone(),
                reason: format!(
                    "Unknown validator. Valid validators: {}",
                    known_validators.join(", ")
                ),
            });
        }
    }
    Ok(())
}

pub fn validate_exclusive_lists(
    first_field: &str,
    first: &[String],
    second_field: &str,
    second: &[String],
) -> Result<()> {
    if !first.is_empty() && !second.is_empty() {
        return Err(GuardError::InvalidConfigValueError {
            field: format!("{}/{}", first_field, second_field),
            value: format!("{:?} / {:?}", first, second),
            reason: "Only one of the two lists can be set".to_string(),
        });
    }
    Ok(())
}
