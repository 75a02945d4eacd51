use crate::utils::error::{GuardError, Result};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::{Range, RangeInclusive};

pub const UNNAMED_BLOCK_LABEL: &str = "(unnamed)";

/// 1-based line and character position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// Closed-closed range of 1-based line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error = 1,
    Warning = 2,
    Info = 3,
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// A `<block>` ... `</block>` span parsed from the comments of a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub attributes: BTreeMap<String, String>,
    /// Position of the start tag, from `<` to `>` inclusive.
    pub start_tag: RangeInclusive<Position>,
    /// Line of the `</block>` tag.
    pub end_tag_line: usize,
    /// Byte range of the text between the start tag comment and the end tag comment.
    pub content_range: Range<usize>,
    pub content_start: Position,
}

/// A single line of a block's content.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentLine<'a> {
    pub number: usize,
    pub text: &'a str,
    /// Character of the first char of `text` on its line.
    pub start_character: usize,
}

impl<'a> ContentLine<'a> {
    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Range of the trimmed text, the end is exclusive.
    pub fn trimmed_range(&self) -> ViolationRange {
        let leading = self.text.len() - self.text.trim_start().len();
        let start = self.start_character + self.text[..leading].chars().count();
        let end = start + self.trimmed().chars().count();
        ViolationRange::new(
            Position::new(self.number, start),
            Position::new(self.number, end),
        )
    }
}

impl Block {
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").map(String::as_str)
    }

    pub fn name_display(&self) -> &str {
        self.name().unwrap_or(UNNAMED_BLOCK_LABEL)
    }

    pub fn starts_at_line(&self) -> usize {
        self.start_tag.start().line
    }

    pub fn ends_at_line(&self) -> usize {
        self.end_tag_line
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Builds an error about one of this block's attributes.
    pub fn attribute_error(&self, file: &str, message: impl Into<String>) -> GuardError {
        GuardError::InvalidAttributeError {
            file: file.to_string(),
            block: self.name_display().to_string(),
            line: self.starts_at_line(),
            message: message.into(),
        }
    }

    pub fn severity(&self, file: &str) -> Result<Severity> {
        match self.attribute("severity").map(str::to_lowercase).as_deref() {
            None | Some("error") => Ok(Severity::Error),
            Some("warning") => Ok(Severity::Warning),
            Some("info") => Ok(Severity::Info),
            Some(other) => Err(self.attribute_error(
                file,
                format!(
                    "severity expected values are \"error\", \"warning\" or \"info\", got \"{}\"",
                    other
                ),
            )),
        }
    }

    /// Lines between the start tag comment and the end tag comment.
    ///
    /// The rest of the start tag line and the indentation before the end tag are
    /// dropped when they hold only whitespace.
    pub fn content_lines<'a>(&self, source: &'a str) -> Vec<ContentLine<'a>> {
        let content = &source[self.content_range.clone()];
        if content.is_empty() {
            return Vec::new();
        }
        let segments: Vec<&str> = content.split('\n').collect();
        let last = segments.len() - 1;
        segments
            .iter()
            .enumerate()
            .filter_map(|(idx, segment)| {
                let text = segment.strip_suffix('\r').unwrap_or(segment);
                if (idx == 0 || idx == last) && text.trim().is_empty() {
                    return None;
                }
                Some(ContentLine {
                    number: self.content_start.line + idx,
                    text,
                    start_character: if idx == 0 {
                        self.content_start.character
                    } else {
                        1
                    },
                })
            })
            .collect()
    }

    /// Range covering the start tag, the end is exclusive.
    pub fn start_tag_range(&self) -> ViolationRange {
        let end = self.start_tag.end();
        ViolationRange::new(
            *self.start_tag.start(),
            Position::new(end.line, end.character + 1),
        )
    }

    /// Whether the block's line span intersects the closed-closed interval.
    pub fn intersects(&self, range: &LineRange) -> bool {
        self.ends_at_line() >= range.start && range.end >= self.starts_at_line()
    }

    /// Whether the block intersects any of the **sorted**, disjoint `ranges`.
    pub fn intersects_any(&self, ranges: &[LineRange]) -> bool {
        ranges
            .binary_search_by(|range| {
                if self.intersects(range) {
                    Ordering::Equal
                } else if range.end < self.starts_at_line() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            })
            .is_ok()
    }
}

/// A parsed source file with its blocks.
#[derive(Debug, Clone)]
pub struct FileBlocks {
    pub path: String,
    pub contents: String,
    pub blocks: Vec<Block>,
}

impl FileBlocks {
    pub fn new(path: String, contents: String, blocks: Vec<Block>) -> Self {
        Self {
            path,
            contents,
            blocks,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ViolationRange {
    pub start: Position,
    pub end: Position,
}

impl ViolationRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// A failed check, serialized as an LSP-like diagnostic with 1-based positions.
#[derive(Serialize, Debug, Clone)]
pub struct Violation {
    pub range: ViolationRange,
    pub code: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Violation {
    pub fn new(
        range: ViolationRange,
        code: &str,
        message: String,
        severity: Severity,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            range,
            code: code.to_string(),
            message,
            severity,
            data,
        }
    }
}

/// Blocks selected for validation, grouped by file path.
#[derive(Debug, Default)]
pub struct ValidationContext {
    pub modified_blocks: HashMap<String, FileBlocks>,
    /// `(file, name)` of every named block that was modified.
    pub modified_names: HashSet<(String, String)>,
}

impl ValidationContext {
    pub fn new(modified_blocks: HashMap<String, FileBlocks>) -> Self {
        let modified_names = modified_blocks
            .iter()
            .flat_map(|(path, file)| {
                file.blocks
                    .iter()
                    .filter_map(move |block| block.name().map(|n| (path.clone(), n.to_string())))
            })
            .collect();
        Self {
            modified_blocks,
            modified_names,
        }
    }

    pub fn is_modified(&self, file: &str, name: &str) -> bool {
        self.modified_names
            .contains(&(file.to_string(), name.to_string()))
    }
}
