use regex::{CaptureMatches, Regex};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

// 屬性值可為雙引號、單引號或不含空白的單字
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?P<start><block(?P<attrs>(?:\s+[A-Za-z0-9_-]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[A-Za-z0-9_-]+))?)*)\s*>)|(?P<end><\s*/\s*block\s*>)"#,
    )
    .expect("block tag regex is valid")
});

static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<name>[A-Za-z0-9_-]+)(?:\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[A-Za-z0-9_-]+)))?"#)
        .expect("block attribute regex is valid")
});

/// A block tag found in a comment. Ranges are byte offsets within the comment text.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Start {
        range: Range<usize>,
        /// Duplicate names keep the last value.
        attributes: BTreeMap<String, String>,
    },
    End {
        range: Range<usize>,
    },
}

/// Iterates over the `<block ...>` and `</block>` tags of a comment's text.
pub struct TagScanner<'a> {
    captures: CaptureMatches<'static, 'a>,
}

impl<'a> TagScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            captures: TAG_REGEX.captures_iter(text),
        }
    }
}

impl Iterator for TagScanner<'_> {
    type Item = Tag;

    fn next(&mut self) -> Option<Tag> {
        let captures = self.captures.next()?;
        if let Some(start) = captures.name("start") {
            let attributes = captures
                .name("attrs")
                .map(|attrs| parse_attributes(attrs.as_str()))
                .unwrap_or_default();
            Some(Tag::Start {
                range: start.range(),
                attributes,
            })
        } else {
            captures.name("end").map(|end| Tag::End { range: end.range() })
        }
    }
}

fn parse_attributes(attrs: &str) -> BTreeMap<String, String> {
    ATTRIBUTE_REGEX
        .captures_iter(attrs)
        .map(|captures| {
            let value = ["dq", "sq", "bare"]
                .iter()
                .find_map(|group| captures.name(group))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (captures["name"].to_string(), value)
        })
        .collect()
}
