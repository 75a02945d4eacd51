use crate::core::comments::{extract_comments, Comment};
use crate::core::languages::CommentSyntax;
use crate::core::tags::{Tag, TagScanner};
use crate::domain::model::{Block, Position};
use crate::utils::error::{GuardError, Result};
use std::collections::BTreeMap;

/// Parses [`Block`]s from source code.
pub trait BlocksParser {
    /// Returns the blocks of `source` sorted by their start tag position.
    fn parse(&self, source: &str) -> Result<Vec<Block>>;
}

/// Finds blocks in the comments of a language.
pub struct CommentBlocksParser {
    syntax: CommentSyntax,
}

impl CommentBlocksParser {
    pub fn new(syntax: CommentSyntax) -> Self {
        Self { syntax }
    }
}

struct OpenBlock {
    comment_index: usize,
    attributes: BTreeMap<String, String>,
    start_tag_start: Position,
    start_tag_end: Position,
}

impl BlocksParser for CommentBlocksParser {
    fn parse(&self, source: &str) -> Result<Vec<Block>> {
        let comments = extract_comments(source, &self.syntax)?;
        let mut blocks = Vec::new();
        let mut open_blocks: Vec<OpenBlock> = Vec::new();

        for (comment_index, comment) in comments.iter().enumerate() {
            for tag in TagScanner::new(comment.text) {
                match tag {
                    Tag::Start { range, attributes } => open_blocks.push(OpenBlock {
                        comment_index,
                        attributes,
                        start_tag_start: comment.position_at(range.start),
                        start_tag_end: comment.position_at(range.end - 1),
                    }),
                    Tag::End { range } => {
                        let end_tag = comment.position_at(range.start);
                        let open = open_blocks.pop().ok_or(GuardError::UnexpectedEndTagError {
                            line: end_tag.line,
                            character: end_tag.character,
                        })?;
                        blocks.push(close_block(
                            open,
                            &comments[..],
                            comment_index,
                            end_tag.line,
                        ));
                    }
                }
            }
        }

        if let Some(unclosed) = open_blocks.pop() {
            return Err(GuardError::UnclosedBlockError {
                line: unclosed.start_tag_start.line,
            });
        }

        blocks.sort_by(|a, b| a.start_tag.start().cmp(b.start_tag.start()));
        Ok(blocks)
    }
}

fn close_block(
    open: OpenBlock,
    comments: &[Comment<'_>],
    end_comment_index: usize,
    end_tag_line: usize,
) -> Block {
    let start_comment = &comments[open.comment_index];
    let end_comment = &comments[end_comment_index];
    // 同一個註解內開始與結束的區塊沒有內容
    let content_range = if open.comment_index == end_comment_index {
        start_comment.source_range.end..start_comment.source_range.end
    } else {
        start_comment.source_range.end..end_comment.source_range.start
    };
    Block {
        attributes: open.attributes,
        start_tag: open.start_tag_start..=open.start_tag_end,
        end_tag_line,
        content_range,
        content_start: start_comment.end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::languages::Languages;

    fn parser(path: &str) -> CommentBlocksParser {
        CommentBlocksParser::new(Languages::builtin().syntax_for(path).unwrap())
    }

    #[test]
    fn test_no_blocks() {
        let blocks = parser("a.rs")
            .parse("fn main() {\n    println!(\"<block>\");\n}\n")
            .unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_single_block_with_single_line_content() {
        let source = r#"/* <block> */ let say = "hi"; /* </block> */"#;
        let blocks = parser("a.rs").parse(source).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].start_tag,
            Position::new(1, 4)..=Position::new(1, 10)
        );
        assert_eq!(
            &source[blocks[0].content_range.clone()],
            " let say = \"hi\"; "
        );
        assert_eq!(blocks[0].content_start, Position::new(1, 14));
        assert_eq!(blocks[0].ends_at_line(), 1);
    }

    #[test]
    fn test_block_with_multiline_content() {
        let source = "fruits = [\n    # <block keep-sorted=\"asc\">\n    'apple',\n    'banana',\n    # </block>\n]\n";
        let blocks = parser("a.py").parse(source).unwrap();

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.attribute("keep-sorted"), Some("asc"));
        assert_eq!(block.starts_at_line(), 2);
        assert_eq!(block.ends_at_line(), 5);
        let lines: Vec<&str> = block
            .content_lines(source)
            .iter()
            .map(|line| line.trimmed())
            .collect();
        assert_eq!(lines, vec!["'apple',", "'banana',"]);
    }

    #[test]
    fn test_multiline_start_tag() {
        let source = "/* <block\n> */ let say = \"hi\"; // </block>";
        let blocks = parser("a.rs").parse(source).unwrap();
        assert_eq!(
            blocks[0].start_tag,
            Position::new(1, 4)..=Position::new(2, 1)
        );
        assert_eq!(blocks[0].content_start, Position::new(2, 5));
    }

    #[test]
    fn test_nested_blocks_sorted_by_start() {
        let source = "\
// <block name=\"outer\">
// <block name=\"inner\">
a
// </block>
b
// </block>
// <block name=\"last\"></block>
";
        let blocks = parser("a.go").parse(source).unwrap();

        let names: Vec<&str> = blocks.iter().map(|b| b.name_display()).collect();
        assert_eq!(names, vec!["outer", "inner", "last"]);
        assert_eq!(blocks[0].ends_at_line(), 6);
        assert_eq!(blocks[1].ends_at_line(), 4);
        assert!(blocks[2].content_lines(source).is_empty());
    }

    #[test]
    fn test_unclosed_block_fails() {
        let err = parser("a.py")
            .parse("x = 1\n# <block>\ny = 2\n")
            .unwrap_err();
        assert_eq!(err.to_string(), "Block at line 2 is not closed");
    }

    #[test]
    fn test_unexpected_end_tag_fails() {
        let err = parser("a.py").parse("x = 1\n  # </block>\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected closed block at line 2, character 5"
        );
    }

    #[test]
    fn test_tags_inside_strings_are_ignored() {
        let source = "s = \"# <block>\"\n";
        assert!(parser("a.py").parse(source).unwrap().is_empty());
    }
}
