pub mod affects;
pub mod keep_sorted;
pub mod keep_unique;
pub mod line_count;
pub mod line_pattern;

use crate::domain::model::{Block, ValidationContext, Violation};
use crate::domain::ports::Validator;
use crate::utils::error::{GuardError, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type ValidatorFactory = fn() -> Box<dyn Validator>;

pub const VALIDATORS: &[(&str, ValidatorFactory)] = &[
    // <block keep-sorted="asc">
    ("affects", || Box::new(affects::AffectsValidator::new())),
    ("keep-sorted", || Box::new(keep_sorted::KeepSortedValidator::new())),
    ("keep-unique", || Box::new(keep_unique::KeepUniqueValidator::new())),
    ("line-count", || Box::new(line_count::LineCountValidator::new())),
    ("line-pattern", || Box::new(line_pattern::LinePatternValidator::new())),
    // </block>
];

pub fn validator_names() -> Vec<&'static str> {
    VALIDATORS.iter().map(|(name, _)| *name).collect()
}

/// Returns the validators to run: only `enabled` ones when given, otherwise all but `disabled`.
pub fn select(enabled: &[String], disabled: &[String]) -> Vec<Box<dyn Validator>> {
    VALIDATORS
        .iter()
        .filter(|(name, _)| {
            if !enabled.is_empty() {
                enabled.iter().any(|e| e.as_str() == *name)
            } else {
                !disabled.iter().any(|d| d.as_str() == *name)
            }
        })
        .map(|(_, factory)| factory())
        .collect()
}

/// Runs the validators concurrently and returns their violations grouped by file path,
/// each file's violations sorted by position.
pub async fn run(
    context: Arc<ValidationContext>,
    validators: Vec<Box<dyn Validator>>,
) -> Result<BTreeMap<String, Vec<Violation>>> {
    let mut tasks = tokio::task::JoinSet::new();
    for validator in validators {
        let context = Arc::clone(&context);
        tasks.spawn(async move {
            tracing::debug!("Running validator {}", validator.name());
            validator.validate(context).await
        });
    }

    let mut violations: BTreeMap<String, Vec<Violation>> = BTreeMap::new();
    while let Some(result) = tasks.join_next().await {
        let file_violations = result.map_err(|e| GuardError::ValidationError {
            message: format!("validator task failed: {}", e),
        })??;
        merge_violations(&mut violations, file_violations);
    }

    for file_violations in violations.values_mut() {
        file_violations.sort_by(|a, b| {
            (a.range.start, &a.code).cmp(&(b.range.start, &b.code))
        });
    }
    Ok(violations)
}

fn merge_violations(
    into: &mut BTreeMap<String, Vec<Violation>>,
    from: HashMap<String, Vec<Violation>>,
) {
    for (file_path, file_violations) in from {
        into.entry(file_path).or_default().extend(file_violations);
    }
}

/// Compiles a regex given in a block attribute.
pub(crate) fn compile_pattern(
    file: &str,
    block: &Block,
    attribute: &str,
    pattern: &str,
) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        block.attribute_error(
            file,
            format!(
                "{} expected a valid regular expression, got \"{}\" (error: {})",
                attribute, pattern, e
            ),
        )
    })
}

/// Extracts the key of `line`: the `value` group, else the first group, else the whole match.
pub(crate) fn extract_key<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    let captures = pattern.captures(line)?;
    captures
        .name("value")
        .or_else(|| captures.get(1))
        .or_else(|| captures.get(0))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FileBlocks, Position, Severity, ViolationRange};
    use async_trait::async_trait;

    struct FakeValidator {
        code: &'static str,
        line: usize,
    }

    #[async_trait]
    impl Validator for FakeValidator {
        fn name(&self) -> &'static str {
            self.code
        }

        async fn validate(
            &self,
            context: Arc<ValidationContext>,
        ) -> Result<HashMap<String, Vec<Violation>>> {
            Ok(context
                .modified_blocks
                .keys()
                .map(|file| {
                    (
                        file.clone(),
                        vec![Violation::new(
                            ViolationRange::new(
                                Position::new(self.line, 1),
                                Position::new(self.line, 2),
                            ),
                            self.code,
                            format!("{} error message", self.code),
                            Severity::Error,
                            None,
                        )],
                    )
                })
                .collect())
        }
    }

    struct FailingValidator;

    #[async_trait]
    impl Validator for FailingValidator {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn validate(
            &self,
            _context: Arc<ValidationContext>,
        ) -> Result<HashMap<String, Vec<Violation>>> {
            Err(GuardError::ValidationError {
                message: "boom".to_string(),
            })
        }
    }

    fn context_with_files(files: &[&str]) -> Arc<ValidationContext> {
        Arc::new(ValidationContext::new(
            files
                .iter()
                .map(|f| {
                    (
                        f.to_string(),
                        FileBlocks::new(f.to_string(), String::new(), vec![]),
                    )
                })
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_run_merges_and_sorts_violations() {
        let validators: Vec<Box<dyn Validator>> = vec![
            Box::new(FakeValidator { code: "b-check", line: 7 }),
            Box::new(FakeValidator { code: "a-check", line: 3 }),
        ];

        let violations = run(context_with_files(&["one.py", "two.py"]), validators)
            .await
            .unwrap();

        assert_eq!(violations.len(), 2);
        let codes: Vec<&str> = violations["one.py"].iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["a-check", "b-check"]);
    }

    #[tokio::test]
    async fn test_run_propagates_validator_errors() {
        let validators: Vec<Box<dyn Validator>> = vec![
            Box::new(FakeValidator { code: "ok", line: 1 }),
            Box::new(FailingValidator),
        ];
        assert!(run(context_with_files(&["one.py"]), validators).await.is_err());
    }

    #[test]
    fn test_select_enabled_and_disabled() {
        let names = |validators: Vec<Box<dyn Validator>>| {
            validators.iter().map(|v| v.name()).collect::<Vec<_>>()
        };

        assert_eq!(names(select(&[], &[])), validator_names());
        assert_eq!(
            names(select(&["keep-sorted".to_string()], &[])),
            vec!["keep-sorted"]
        );
        assert_eq!(
            names(select(&[], &["affects".to_string(), "line-count".to_string()])),
            vec!["keep-sorted", "keep-unique", "line-pattern"]
        );
    }

    #[test]
    fn test_extract_key_prefers_value_group() {
        let named = Regex::new(r"id: (?P<value>\d+)").unwrap();
        let positional = Regex::new(r"^(\w+) =").unwrap();
        let whole = Regex::new(r"\d+").unwrap();

        assert_eq!(extract_key(&named, "\"id: 10 orange\","), Some("10"));
        assert_eq!(extract_key(&positional, "alpha = 1"), Some("alpha"));
        assert_eq!(extract_key(&whole, "item 42"), Some("42"));
        assert_eq!(extract_key(&whole, "no digits"), None);
    }
}
