use crate::core::languages::{CommentSyntax, Grammar};
use crate::domain::model::Position;
use crate::utils::error::{GuardError, Result};
use std::ops::Range;
use tree_sitter::{Node, Parser};

/// Node kinds the supported grammars use for comments.
const COMMENT_KINDS: &[&str] = &["comment", "line_comment", "block_comment"];

/// A comment found in a source file, delimiters included.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment<'a> {
    pub text: &'a str,
    pub source_range: Range<usize>,
    pub start: Position,
    /// Exclusive.
    pub end: Position,
}

impl<'a> Comment<'a> {
    fn new(text: &'a str, offset: usize, start: Position) -> Self {
        let mut end = start;
        for ch in text.chars() {
            advance(&mut end, ch);
        }
        Self {
            text,
            source_range: offset..offset + text.len(),
            start,
            end,
        }
    }

    /// Source position of the byte at `offset` within the comment text.
    pub fn position_at(&self, offset: usize) -> Position {
        let mut position = self.start;
        for ch in self.text[..offset].chars() {
            advance(&mut position, ch);
        }
        position
    }
}

fn advance(position: &mut Position, ch: char) {
    if ch == '\n' {
        position.line += 1;
        position.character = 1;
    } else {
        position.character += 1;
    }
}

struct Cursor<'a> {
    source: &'a str,
    offset: usize,
    position: Position,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn skip(&mut self, bytes: usize) {
        for ch in self.source[self.offset..self.offset + bytes].chars() {
            advance(&mut self.position, ch);
        }
        self.offset += bytes;
    }

    fn take(&mut self, bytes: usize) -> Comment<'a> {
        let start = self.position;
        let source_range = self.offset..self.offset + bytes;
        self.skip(bytes);
        Comment {
            text: &self.source[source_range.clone()],
            source_range,
            start,
            end: self.position,
        }
    }
}

/// Length in bytes of a string literal starting at `rest`, if it closes on the same line.
fn string_literal_len(rest: &str, quote: char) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1);
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\n' => return None,
            '\\' => {
                chars.next();
            }
            c if c == quote => return Some(idx + c.len_utf8()),
            _ => {}
        }
    }
    None
}

/// Extracts all comments from `source` in order of appearance, from the syntax tree when
/// the language has a grammar and with [`scan_comments`] otherwise.
pub fn extract_comments<'a>(source: &'a str, syntax: &CommentSyntax) -> Result<Vec<Comment<'a>>> {
    match syntax.grammar {
        Some(grammar) => tree_comments(source, grammar),
        None => Ok(scan_comments(source, syntax)),
    }
}

fn tree_comments(source: &str, grammar: Grammar) -> Result<Vec<Comment<'_>>> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar.language())
        .map_err(|e| GuardError::GrammarError {
            message: format!("{:?}: {}", grammar, e),
        })?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| GuardError::GrammarError {
            message: format!("{:?}: parsing was cancelled", grammar),
        })?;

    let mut comments = Vec::new();
    let mut cursor = tree.walk();
    'walk: loop {
        let node = cursor.node();
        if COMMENT_KINDS.contains(&node.kind()) {
            comments.push(comment_from_node(source, &node));
        } else if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    Ok(comments)
}

fn comment_from_node<'a>(source: &'a str, node: &Node<'_>) -> Comment<'a> {
    let range = node.byte_range();
    // 部分文法的行註解包含換行
    let text = source[range.clone()].trim_end_matches(&['\n', '\r'][..]);
    let point = node.start_position();
    let line_start = range.start - point.column;
    let start = Position::new(
        point.row + 1,
        source[line_start..range.start].chars().count() + 1,
    );
    Comment::new(text, range.start, start)
}

/// Lexical scanner for languages without a grammar.
///
/// Single-quoted and double-quoted strings are skipped only when they close on the line
/// they open, which keeps apostrophes and lifetimes from hiding the rest of a line.
/// `multiline_quotes` strings may span lines.
pub fn scan_comments<'a>(source: &'a str, syntax: &CommentSyntax) -> Vec<Comment<'a>> {
    let mut comments = Vec::new();
    let mut cursor = Cursor {
        source,
        offset: 0,
        position: Position::new(1, 1),
    };

    'scan: while cursor.offset < source.len() {
        let rest = cursor.rest();

        for (open, close) in syntax.block {
            if rest.starts_with(open) {
                let len = rest[open.len()..]
                    .find(close)
                    .map(|idx| open.len() + idx + close.len())
                    .unwrap_or(rest.len());
                comments.push(cursor.take(len));
                continue 'scan;
            }
        }

        for marker in syntax.line {
            if rest.starts_with(marker) {
                let len = rest.find('\n').unwrap_or(rest.len());
                comments.push(cursor.take(len));
                continue 'scan;
            }
        }

        for (open, close) in syntax.multiline_quotes {
            if rest.starts_with(open) {
                // 未結束的字串只略過開頭符號
                let len = rest[open.len()..]
                    .find(close)
                    .map(|idx| open.len() + idx + close.len())
                    .unwrap_or(open.len());
                cursor.skip(len);
                continue 'scan;
            }
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        if syntax.quotes.contains(&ch) {
            if let Some(len) = string_literal_len(rest, ch) {
                cursor.skip(len);
                continue;
            }
        }
        cursor.skip(ch.len_utf8());
    }

    comments
}
