use crate::domain::model::{Block, ValidationContext, Violation};
use crate::domain::ports::Validator;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub const AFFECTS: &str = "affects";

/// Reports modified blocks whose `affects` targets were not modified with them.
pub struct AffectsValidator {}

impl AffectsValidator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for AffectsValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct AffectsViolation<'a> {
    affected_file: &'a str,
    affected_block: &'a str,
}

#[async_trait]
impl Validator for AffectsValidator {
    fn name(&self) -> &'static str {
        AFFECTS
    }

    async fn validate(
        &self,
        context: Arc<ValidationContext>,
    ) -> Result<HashMap<String, Vec<Violation>>> {
        let mut violations = HashMap::new();
        for (file_path, file_blocks) in &context.modified_blocks {
            for block in &file_blocks.blocks {
                let Some(value) = block.attribute(AFFECTS) else {
                    continue;
                };
                let severity = block.severity(file_path)?;
                for (affected_file, affected_block) in
                    parse_affects_attribute(file_path, block, value)?
                {
                    let affected_file = affected_file.unwrap_or(file_path.as_str());
                    if context.is_modified(affected_file, affected_block) {
                        continue;
                    }
                    tracing::debug!(
                        "{}:{} affects {}:{} which was not modified",
                        file_path,
                        block.name_display(),
                        affected_file,
                        affected_block
                    );
                    violations
                        .entry(file_path.clone())
                        .or_insert_with(Vec::new)
                        .push(Violation::new(
                            block.start_tag_range(),
                            AFFECTS,
                            format!(
                                "Block {}:{} at line {} is modified, but {}:{} is not",
                                file_path,
                                block.name_display(),
                                block.starts_at_line(),
                                affected_file,
                                affected_block
                            ),
                            severity,
                            Some(serde_json::to_value(AffectsViolation {
                                affected_file,
                                affected_block,
                            })?),
                        ));
                }
            }
        }
        Ok(violations)
    }
}

/// Splits `path:name, :name` into `(Some(path), name)` and `(None, name)` references.
pub fn parse_affects_attribute<'a>(
    file: &str,
    block: &Block,
    value: &'a str,
) -> Result<Vec<(Option<&'a str>, &'a str)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|reference| !reference.is_empty())
        .map(|reference| {
            let invalid = || {
                block.attribute_error(
                    file,
                    format!(
                        "Invalid \"affects\" attribute value: \"{}\", expected \"path:name\" or \":name\"",
                        reference
                    ),
                )
            };
            let (path, name) = reference.rsplit_once(':').ok_or_else(invalid)?;
            let (path, name) = (path.trim(), name.trim());
            if name.is_empty() {
                return Err(invalid());
            }
            Ok(((!path.is_empty()).then_some(path), name))
        })
        .collect()
}
