use crate::domain::model::{Block, ContentLine, Severity, ValidationContext, Violation};
use crate::domain::ports::Validator;
use crate::utils::error::Result;
use crate::validators::{compile_pattern, extract_key};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

pub const KEEP_SORTED: &str = "keep-sorted";
pub const KEEP_SORTED_PATTERN: &str = "keep-sorted-pattern";
pub const KEEP_SORTED_FORMAT: &str = "keep-sorted-format";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// How sort keys are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortFormat {
    /// Byte order of the key.
    Lexical,
    /// Keys parsed as numbers.
    Numeric,
    /// Digit runs compared by value, everything else lexically.
    Natural,
}

impl SortFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortFormat::Lexical => "lexical",
            SortFormat::Numeric => "numeric",
            SortFormat::Natural => "natural",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortKey<'a> {
    Text(&'a str),
    Number(f64),
}

/// The `keep-sorted*` attributes of a block.
#[derive(Debug, Clone)]
pub struct SortSpec {
    pub order: SortOrder,
    pub format: SortFormat,
    pub pattern: Option<Regex>,
}

/// Outcome of computing a line's sort key.
pub enum LineKey<'a> {
    /// The line does not take part in the ordering.
    Skipped,
    Key(SortKey<'a>),
    /// Numeric format, but the key is not a number.
    NotANumber(&'a str),
}

impl SortSpec {
    /// Reads the sort attributes of `block`, `None` when it has no `keep-sorted` attribute.
    pub fn from_block(file: &str, block: &Block) -> Result<Option<Self>> {
        let Some(keep_sorted) = block.attribute(KEEP_SORTED) else {
            return Ok(None);
        };
        let order = match keep_sorted.to_lowercase().as_str() {
            "" | "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => {
                return Err(block.attribute_error(
                    file,
                    format!(
                        "keep-sorted expected values are \"asc\" or \"desc\", got \"{}\"",
                        keep_sorted
                    ),
                ))
            }
        };
        let format = match block.attribute(KEEP_SORTED_FORMAT).map(str::to_lowercase) {
            None => SortFormat::Lexical,
            Some(format) => match format.as_str() {
                "" | "lexical" => SortFormat::Lexical,
                "numeric" => SortFormat::Numeric,
                "natural" => SortFormat::Natural,
                _ => {
                    return Err(block.attribute_error(
                        file,
                        format!(
                            "keep-sorted-format expected values are \"lexical\", \"numeric\" or \"natural\", got \"{}\"",
                            format
                        ),
                    ))
                }
            },
        };
        let pattern = block
            .attribute(KEEP_SORTED_PATTERN)
            .map(|pattern| compile_pattern(file, block, KEEP_SORTED_PATTERN, pattern))
            .transpose()?;
        Ok(Some(Self {
            order,
            format,
            pattern,
        }))
    }

    pub fn line_key<'a>(&self, line: &ContentLine<'a>) -> LineKey<'a> {
        if line.is_blank() {
            return LineKey::Skipped;
        }
        let text = line.trimmed();
        let key = match &self.pattern {
            Some(pattern) => match extract_key(pattern, text) {
                Some(key) => key,
                None => return LineKey::Skipped,
            },
            None => text,
        };
        match self.format {
            SortFormat::Numeric => match key.trim().parse::<f64>() {
                Ok(number) => LineKey::Key(SortKey::Number(number)),
                Err(_) => LineKey::NotANumber(key),
            },
            SortFormat::Lexical | SortFormat::Natural => LineKey::Key(SortKey::Text(key)),
        }
    }

    /// Ascending comparison of two keys.
    pub fn compare(&self, a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
        match (a, b) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) if self.format == SortFormat::Natural => {
                natural_cmp(a, b)
            }
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }

    /// Comparison in the block's order, `Less` means `a` goes first.
    pub fn ordering(&self, a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
        match self.order {
            SortOrder::Asc => self.compare(a, b),
            SortOrder::Desc => self.compare(a, b).reverse(),
        }
    }
}

/// Compares strings treating runs of ASCII digits as numbers: `item2` < `item10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chunks = Chunks::new(a);
    let mut b_chunks = Chunks::new(b);
    loop {
        match (a_chunks.next(), b_chunks.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (is_digits(x), is_digits(y)) {
                    (true, true) => {
                        let x_trimmed = x.trim_start_matches('0');
                        let y_trimmed = y.trim_start_matches('0');
                        x_trimmed
                            .len()
                            .cmp(&y_trimmed.len())
                            .then_with(|| x_trimmed.cmp(y_trimmed))
                            .then_with(|| x.len().cmp(&y.len()))
                    }
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn is_digits(chunk: &str) -> bool {
    chunk.starts_with(|c: char| c.is_ascii_digit())
}

/// Splits a string into alternating digit and non-digit runs.
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

pub struct KeepSortedValidator {}

impl KeepSortedValidator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for KeepSortedValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct KeepSortedViolation<'a> {
    order_by: &'a str,
    format: &'a str,
}

#[async_trait]
impl Validator for KeepSortedValidator {
    fn name(&self) -> &'static str {
        KEEP_SORTED
    }

    async fn validate(
        &self,
        context: Arc<ValidationContext>,
    ) -> Result<HashMap<String, Vec<Violation>>> {
        let mut violations = HashMap::new();
        for (file_path, file_blocks) in &context.modified_blocks {
            for block in &file_blocks.blocks {
                let Some(spec) = SortSpec::from_block(file_path, block)? else {
                    continue;
                };
                if let Some(violation) =
                    check_block(file_path, block, &spec, &file_blocks.contents)?
                {
                    violations
                        .entry(file_path.clone())
                        .or_insert_with(Vec::new)
                        .push(violation);
                }
            }
        }
        Ok(violations)
    }
}

/// Returns a violation for the first line out of order, if any.
fn check_block(
    file_path: &str,
    block: &Block,
    spec: &SortSpec,
    contents: &str,
) -> Result<Option<Violation>> {
    let severity = block.severity(file_path)?;
    let mut prev_key: Option<SortKey> = None;
    for line in block.content_lines(contents) {
        match spec.line_key(&line) {
            LineKey::Skipped => continue,
            LineKey::NotANumber(key) => {
                let message = format!(
                    "Block {}:{} defined at line {} has a non-numeric sort key at line {} (\"{}\")",
                    file_path,
                    block.name_display(),
                    block.starts_at_line(),
                    line.number,
                    key
                );
                return Ok(Some(create_violation(&line, message, spec, severity)?));
            }
            LineKey::Key(key) => {
                if let Some(prev) = &prev_key {
                    if spec.ordering(prev, &key) == Ordering::Greater {
                        let message = format!(
                            "Block {}:{} defined at line {} has an out-of-order line {} ({})",
                            file_path,
                            block.name_display(),
                            block.starts_at_line(),
                            line.number,
                            spec.order.as_str()
                        );
                        return Ok(Some(create_violation(&line, message, spec, severity)?));
                    }
                }
                prev_key = Some(key);
            }
        }
    }
    Ok(None)
}

fn create_violation(
    line: &ContentLine<'_>,
    message: String,
    spec: &SortSpec,
    severity: Severity,
) -> Result<Violation> {
    Ok(Violation::new(
        line.trimmed_range(),
        KEEP_SORTED,
        message,
        severity,
        Some(serde_json::to_value(KeepSortedViolation {
            order_by: spec.order.as_str(),
            format: spec.format.as_str(),
        })?),
    ))
}
