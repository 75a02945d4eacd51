use crate::domain::model::{ValidationContext, Violation};
use crate::domain::ports::Validator;
use crate::utils::error::Result;
use crate::validators::compile_pattern;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub const LINE_PATTERN: &str = "line-pattern";

pub struct LinePatternValidator {}

impl LinePatternValidator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LinePatternValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct LinePatternViolation<'a> {
    pattern: &'a str,
}

#[async_trait]
impl Validator for LinePatternValidator {
    fn name(&self) -> &'static str {
        LINE_PATTERN
    }

    async fn validate(
        &self,
        context: Arc<ValidationContext>,
    ) -> Result<HashMap<String, Vec<Violation>>> {
        let mut violations = HashMap::new();
        for (file_path, file_blocks) in &context.modified_blocks {
            for block in &file_blocks.blocks {
                let Some(pattern) = block.attribute(LINE_PATTERN) else {
                    continue;
                };
                // 整行比對
                let anchored = format!("^(?:{})$", pattern);
                let regex = compile_pattern(file_path, block, LINE_PATTERN, &anchored)?;
                let severity = block.severity(file_path)?;

                for line in block.content_lines(&file_blocks.contents) {
                    if line.is_blank() || regex.is_match(line.trimmed()) {
                        continue;
                    }
                    violations
                        .entry(file_path.clone())
                        .or_insert_with(Vec::new)
                        .push(Violation::new(
                            line.trimmed_range(),
                            LINE_PATTERN,
                            format!(
                                "Block {}:{} defined at line {} has a non-matching line {} (pattern: /{}/)",
                                file_path,
                                block.name_display(),
                                block.starts_at_line(),
                                line.number,
                                pattern
                            ),
                            severity,
                            Some(serde_json::to_value(LinePatternViolation { pattern })?),
                        ));
                    break;
                }
            }
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blocks::{BlocksParser, CommentBlocksParser};
    use crate::core::languages::Languages;
    use crate::domain::model::{FileBlocks, Position, Severity, ViolationRange};
    use serde_json::json;

    async fn validate(contents: &str) -> Result<HashMap<String, Vec<Violation>>> {
        let parser = CommentBlocksParser::new(Languages::builtin().syntax_for("a.ts").unwrap());
        let blocks = parser.parse(contents).unwrap();
        let context = ValidationContext::new(HashMap::from([(
            "a.ts".to_string(),
            FileBlocks::new("a.ts".to_string(), contents.to_string(), blocks),
        )]));
        LinePatternValidator::new().validate(Arc::new(context)).await
    }

    #[tokio::test]
    async fn test_matching_lines_return_no_violations() {
        let violations = validate(
            "const slugs = [\n  // <block line-pattern=\"'[a-z0-9-]+',\">\n  'hello-world',\n\n  'rust-2024',\n  // </block>\n];\n",
        )
        .await
        .unwrap();
        assert!(violations.is_empty());
    }

    #[tokio::test]
    async fn test_first_non_matching_line_is_reported() {
        let violations = validate(
            "const slugs = [\n  // <block line-pattern=\"'[a-z0-9-]+',\" severity=\"info\">\n  'hello-world',\n  'Hello World',\n  'ok',\n  'x', 'y',\n  // </block>\n];\n",
        )
        .await
        .unwrap();

        let file_violations = &violations["a.ts"];
        assert_eq!(file_violations.len(), 1);
        assert_eq!(
            file_violations[0].message,
            "Block a.ts:(unnamed) defined at line 2 has a non-matching line 4 (pattern: /'[a-z0-9-]+',/)"
        );
        assert_eq!(file_violations[0].severity, Severity::Info);
        assert_eq!(
            file_violations[0].range,
            ViolationRange::new(Position::new(4, 3), Position::new(4, 17))
        );
        assert_eq!(
            file_violations[0].data,
            Some(json!({"pattern": "'[a-z0-9-]+',"}))
        );
    }

    #[tokio::test]
    async fn test_partial_match_is_reported() {
        let violations = validate("// <block line-pattern=\"[a-z]+\">\nabc\nabc def\n// </block>\n")
            .await
            .unwrap();
        assert_eq!(violations["a.ts"][0].range.start.line, 3);
    }

    #[tokio::test]
    async fn test_invalid_pattern_returns_error() {
        let result = validate("// <block line-pattern=\"(\">\nx\n// </block>\n").await;
        assert!(result.is_err());
    }
}
