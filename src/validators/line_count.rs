use crate::domain::model::{Block, ValidationContext, Violation};
use crate::domain::ports::Validator;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub const LINE_COUNT: &str = "line-count";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Op {
    fn as_str(&self) -> &'static str {
        match self {
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Eq => "==",
            Op::Ge => ">=",
            Op::Gt => ">",
        }
    }

    fn holds(&self, actual: usize, expected: usize) -> bool {
        match self {
            Op::Lt => actual < expected,
            Op::Le => actual <= expected,
            Op::Eq => actual == expected,
            Op::Ge => actual >= expected,
            Op::Gt => actual > expected,
        }
    }
}

/// Parses `<N`, `<=N`, `==N`, `>=N` or `>N`.
fn parse_constraint(s: &str) -> Option<(Op, usize)> {
    let trimmed = s.trim();
    // 兩字元的運算子要先比對
    let (op, rest) = [
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("==", Op::Eq),
        ("<", Op::Lt),
        (">", Op::Gt),
    ]
    .iter()
    .find_map(|(prefix, op)| trimmed.strip_prefix(prefix).map(|rest| (*op, rest)))?;
    let expected = rest.trim().parse::<usize>().ok()?;
    Some((op, expected))
}

pub struct LineCountValidator {}

impl LineCountValidator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LineCountValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct LineCountViolation {
    actual: usize,
    op: &'static str,
    expected: usize,
}

#[async_trait]
impl Validator for LineCountValidator {
    fn name(&self) -> &'static str {
        LINE_COUNT
    }

    async fn validate(
        &self,
        context: Arc<ValidationContext>,
    ) -> Result<HashMap<String, Vec<Violation>>> {
        let mut violations = HashMap::new();
        for (file_path, file_blocks) in &context.modified_blocks {
            for block in &file_blocks.blocks {
                let Some(expr) = block.attribute(LINE_COUNT) else {
                    continue;
                };
                let (op, expected) = parse_constraint(expr).ok_or_else(|| {
                    block.attribute_error(
                        file_path,
                        format!(
                            "line-count expected a comparator like <N, <=N, ==N, >=N, >N, got \"{}\"",
                            expr
                        ),
                    )
                })?;
                let actual = block
                    .content_lines(&file_blocks.contents)
                    .iter()
                    .filter(|line| !line.is_blank())
                    .count();
                if op.holds(actual, expected) {
                    continue;
                }
                violations
                    .entry(file_path.clone())
                    .or_insert_with(Vec::new)
                    .push(create_violation(file_path, block, op, expected, actual)?);
            }
        }
        Ok(violations)
    }
}

fn create_violation(
    file_path: &str,
    block: &Block,
    op: Op,
    expected: usize,
    actual: usize,
) -> Result<Violation> {
    let message = format!(
        "Block {}:{} defined at line {} has {} lines, which does not satisfy {}{}",
        file_path,
        block.name_display(),
        block.starts_at_line(),
        actual,
        op.as_str(),
        expected
    );
    Ok(Violation::new(
        block.start_tag_range(),
        LINE_COUNT,
        message,
        block.severity(file_path)?,
        Some(serde_json::to_value(LineCountViolation {
            actual,
            op: op.as_str(),
            expected,
        })?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blocks::{BlocksParser, CommentBlocksParser};
    use crate::core::languages::Languages;
    use crate::domain::model::{FileBlocks, Position, ViolationRange};
    use serde_json::json;

    async fn validate(contents: &str) -> Result<HashMap<String, Vec<Violation>>> {
        let parser = CommentBlocksParser::new(Languages::builtin().syntax_for("a.rs").unwrap());
        let blocks = parser.parse(contents).unwrap();
        let context = ValidationContext::new(HashMap::from([(
            "a.rs".to_string(),
            FileBlocks::new("a.rs".to_string(), contents.to_string(), blocks),
        )]));
        LineCountValidator::new().validate(Arc::new(context)).await
    }

    #[test]
    fn test_parse_constraint() {
        assert_eq!(parse_constraint("<3"), Some((Op::Lt, 3)));
        assert_eq!(parse_constraint(" <= 10 "), Some((Op::Le, 10)));
        assert_eq!(parse_constraint("==0"), Some((Op::Eq, 0)));
        assert_eq!(parse_constraint(">=2"), Some((Op::Ge, 2)));
        assert_eq!(parse_constraint(">7"), Some((Op::Gt, 7)));
        assert_eq!(parse_constraint("3"), None);
        assert_eq!(parse_constraint("<"), None);
        assert_eq!(parse_constraint("=3"), None);
        assert_eq!(parse_constraint(">-1"), None);
    }

    #[tokio::test]
    async fn test_satisfied_constraints_return_no_violations() {
        let violations = validate(
            "// <block line-count=\"<=3\">\nlet a = 1;\n\nlet b = 2;\n// </block>\n// <block line-count=\"==0\"></block>\n",
        )
        .await
        .unwrap();
        assert!(violations.is_empty());
    }

    #[tokio::test]
    async fn test_unsatisfied_constraint_returns_violation() {
        let violations = validate(
            "fn f() {\n    // <block name=\"short\" line-count=\"<2\">\n    a();\n    b();\n    // </block>\n}\n",
        )
        .await
        .unwrap();

        let file_violations = &violations["a.rs"];
        assert_eq!(file_violations.len(), 1);
        assert_eq!(
            file_violations[0].message,
            "Block a.rs:short defined at line 2 has 2 lines, which does not satisfy <2"
        );
        assert_eq!(
            file_violations[0].range,
            ViolationRange::new(Position::new(2, 8), Position::new(2, 44))
        );
        assert_eq!(
            file_violations[0].data,
            Some(json!({"actual": 2, "op": "<", "expected": 2}))
        );
    }

    #[tokio::test]
    async fn test_invalid_constraint_returns_error() {
        let err = validate("// <block line-count=\"about 3\">\n// </block>\n")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("line-count expected a comparator"));
    }
}
