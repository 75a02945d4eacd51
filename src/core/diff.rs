use crate::domain::model::LineRange;
use crate::utils::error::{GuardError, Result};
use diffy::{Line, Patch};
use std::collections::BTreeMap;

const FILE_DIFF_PREFIX: &str = "diff --git";

/// Splits a multi-file patch at every `diff --git` line.
fn file_diffs(patch: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut chunk_start = 0;
    for (newline, _) in patch.match_indices('\n') {
        let line_start = newline + 1;
        if line_start > chunk_start && patch[line_start..].starts_with(FILE_DIFF_PREFIX) {
            chunks.push(&patch[chunk_start..line_start]);
            chunk_start = line_start;
        }
    }
    chunks.push(&patch[chunk_start..]);
    chunks
}

/// Mode changes, renames and binary files carry no `+++` header and no hunks.
fn has_file_header(chunk: &str) -> bool {
    chunk.lines().any(|line| line.starts_with("+++ "))
}

fn new_file_path(modified: &str) -> Option<String> {
    // 去除 tab 之後的時間戳記
    let path = modified.split('\t').next().unwrap_or(modified).trim();
    let path = path.trim_matches('"');
    if path == "/dev/null" {
        return None;
    }
    Some(path.strip_prefix("b/").unwrap_or(path).to_string())
}

/// New-file line numbers touched by the hunks of one file.
///
/// Inserted lines mark their own line. Deleted lines mark the line now at the deletion
/// point, so a deletion followed by an insertion counts as one modified line.
fn modified_lines(patch: &Patch<'_, str>) -> Vec<usize> {
    let mut lines = Vec::new();
    for hunk in patch.hunks() {
        let mut new_line = hunk.new_range().start();
        for line in hunk.lines() {
            match line {
                Line::Insert(_) => {
                    lines.push(new_line.max(1));
                    new_line += 1;
                }
                Line::Delete(_) => lines.push(new_line.max(1)),
                Line::Context(_) => new_line += 1,
            }
        }
    }
    lines
}

/// Parses a unified diff (`git diff --patch`) into the modified line ranges of each new file.
pub fn parse_modified_lines(patch: &str) -> Result<BTreeMap<String, Vec<LineRange>>> {
    let mut files = BTreeMap::new();
    for chunk in file_diffs(patch) {
        if !has_file_header(chunk) {
            continue;
        }
        let parsed = Patch::from_str(chunk).map_err(|e| GuardError::DiffError {
            message: e.to_string(),
        })?;
        let Some(path) = parsed.modified().and_then(new_file_path) else {
            tracing::debug!("Skipping deleted file {:?}", parsed.original());
            continue;
        };
        files.insert(path, merge_lines(modified_lines(&parsed)));
    }
    Ok(files)
}

fn merge_lines(mut lines: Vec<usize>) -> Vec<LineRange> {
    lines.sort_unstable();
    lines.dedup();
    let mut ranges: Vec<LineRange> = Vec::new();
    for line in lines {
        match ranges.last_mut() {
            Some(last) if last.end + 1 == line => last.end = line,
            _ => ranges.push(LineRange::new(line, line)),
        }
    }
    ranges
}
