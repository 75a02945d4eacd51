use crate::domain::model::Block;
use crate::utils::error::Result;
use crate::validators::keep_sorted::{LineKey, SortSpec};
use std::ops::Range;

/// Result of rewriting the `keep-sorted` blocks of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct FixOutcome {
    pub contents: String,
    pub fixed_blocks: usize,
}

impl FixOutcome {
    pub fn is_changed(&self) -> bool {
        self.fixed_blocks > 0
    }
}

struct Edit {
    range: Range<usize>,
    replacement: String,
}

/// Sorts the lines of the unsorted `keep-sorted` blocks of `source` accepted by `selected`.
///
/// `blocks` are all the blocks of the file. Participating lines are stably sorted
/// and written back into the slots they occupied, keeping each slot's indentation.
/// Other lines do not move.
pub fn fix_keep_sorted(
    file: &str,
    source: &str,
    blocks: &[Block],
    selected: impl Fn(&Block) -> bool,
) -> Result<FixOutcome> {
    let mut edits = Vec::new();
    let mut fixed_blocks = 0;

    for block in blocks.iter().filter(|block| selected(*block)) {
        let Some(spec) = SortSpec::from_block(file, block)? else {
            continue;
        };
        if has_nested_blocks(block, blocks) {
            tracing::warn!(
                "Skipping fix of {}:{} at line {}: nested blocks are not supported",
                file,
                block.name_display(),
                block.starts_at_line()
            );
            continue;
        }
        if let Some(block_edits) = block_edits(source, block, &spec) {
            tracing::debug!(
                "Sorting {}:{} at line {}",
                file,
                block.name_display(),
                block.starts_at_line()
            );
            edits.extend(block_edits);
            fixed_blocks += 1;
        }
    }

    let mut contents = source.to_string();
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    for edit in edits {
        contents.replace_range(edit.range, &edit.replacement);
    }
    Ok(FixOutcome {
        contents,
        fixed_blocks,
    })
}

fn has_nested_blocks(block: &Block, blocks: &[Block]) -> bool {
    blocks.iter().any(|other| {
        other.start_tag.start() > block.start_tag.start()
            && other.content_range.start <= block.content_range.end
            && other.ends_at_line() <= block.ends_at_line()
    })
}

/// Edits that sort `block`, `None` when it is already sorted or cannot be sorted.
fn block_edits(source: &str, block: &Block, spec: &SortSpec) -> Option<Vec<Edit>> {
    let lines = block.content_lines(source);
    let mut keyed = Vec::new();
    for line in &lines {
        match spec.line_key(line) {
            LineKey::Skipped => {}
            LineKey::Key(key) => keyed.push((line, key)),
            // 數字格式但無法解析，保持原樣
            LineKey::NotANumber(_) => return None,
        }
    }

    let mut sorted = keyed.clone();
    sorted.sort_by(|(_, a), (_, b)| spec.ordering(a, b));
    if sorted
        .iter()
        .zip(&keyed)
        .all(|((a, _), (b, _))| a.number == b.number)
    {
        return None;
    }

    Some(
        keyed
            .iter()
            .zip(&sorted)
            .map(|((slot, _), (moved, _))| Edit {
                range: trimmed_byte_range(source, slot.text),
                replacement: moved.trimmed().to_string(),
            })
            .collect(),
    )
}

/// Byte range in `source` of the trimmed part of `text`, a slice of `source`.
fn trimmed_byte_range(source: &str, text: &str) -> Range<usize> {
    let offset = text.as_ptr() as usize - source.as_ptr() as usize;
    let leading = text.len() - text.trim_start().len();
    let start = offset + leading;
    start..start + text.trim().len()
}
