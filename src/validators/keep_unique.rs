use crate::domain::model::{ValidationContext, Violation};
use crate::domain::ports::Validator;
use crate::utils::error::Result;
use crate::validators::{compile_pattern, extract_key};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub const KEEP_UNIQUE: &str = "keep-unique";

/// Reports the first line of a `keep-unique` block whose key was already seen in the block.
///
/// With an empty attribute the key is the trimmed line, otherwise the value is a
/// regex and the key is extracted the same way `keep-sorted-pattern` does.
pub struct KeepUniqueValidator {}

impl KeepUniqueValidator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for KeepUniqueValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct KeepUniqueViolation {
    first_seen_at_line: usize,
}

#[async_trait]
impl Validator for KeepUniqueValidator {
    fn name(&self) -> &'static str {
        KEEP_UNIQUE
    }

    async fn validate(
        &self,
        context: Arc<ValidationContext>,
    ) -> Result<HashMap<String, Vec<Violation>>> {
        let mut violations = HashMap::new();
        for (file_path, file_blocks) in &context.modified_blocks {
            for block in &file_blocks.blocks {
                let Some(value) = block.attribute(KEEP_UNIQUE) else {
                    continue;
                };
                let pattern = if value.is_empty() {
                    None
                } else {
                    Some(compile_pattern(file_path, block, KEEP_UNIQUE, value)?)
                };
                let severity = block.severity(file_path)?;

                let mut seen: HashMap<&str, usize> = HashMap::new();
                for line in block.content_lines(&file_blocks.contents) {
                    if line.is_blank() {
                        continue;
                    }
                    let key = match &pattern {
                        Some(pattern) => match extract_key(pattern, line.trimmed()) {
                            Some(key) => key,
                            None => continue,
                        },
                        None => line.trimmed(),
                    };
                    if let Some(first_seen) = seen.get(key) {
                        violations
                            .entry(file_path.clone())
                            .or_insert_with(Vec::new)
                            .push(Violation::new(
                                line.trimmed_range(),
                                KEEP_UNIQUE,
                                format!(
                                    "Block {}:{} defined at line {} has a duplicated line {}",
                                    file_path,
                                    block.name_display(),
                                    block.starts_at_line(),
                                    line.number
                                ),
                                severity,
                                Some(serde_json::to_value(KeepUniqueViolation {
                                    first_seen_at_line: *first_seen,
                                })?),
                            ));
                        break;
                    } else {
                        seen.insert(key, line.number);
                    }
                }
            }
        }
        Ok(violations)
    }
}
