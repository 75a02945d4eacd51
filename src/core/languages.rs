use crate::utils::error::{GuardError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tree_sitter::Language;

/// Tree-sitter grammars used to find comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Bash,
    C,
    CSharp,
    Cpp,
    Css,
    Go,
    Html,
    Java,
    JavaScript,
    Php,
    Python,
    Ruby,
    Rust,
    Toml,
    Tsx,
    TypeScript,
    Yaml,
}

impl Grammar {
    pub fn language(self) -> Language {
        match self {
            Grammar::Bash => tree_sitter_bash::LANGUAGE.into(),
            Grammar::C => tree_sitter_c::LANGUAGE.into(),
            Grammar::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Grammar::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Grammar::Css => tree_sitter_css::LANGUAGE.into(),
            Grammar::Go => tree_sitter_go::LANGUAGE.into(),
            Grammar::Html => tree_sitter_html::LANGUAGE.into(),
            Grammar::Java => tree_sitter_java::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::Php => tree_sitter_php::LANGUAGE_PHP.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::Ruby => tree_sitter_ruby::LANGUAGE.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Toml => tree_sitter_toml_ng::LANGUAGE.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Yaml => tree_sitter_yaml::LANGUAGE.into(),
        }
    }
}

/// Comment delimiters of a language.
///
/// With a `grammar`, comments come from the syntax tree and the delimiters are unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line: &'static [&'static str],
    /// `(open, close)` pairs. Checked before `line`, so `--[[` wins over `--`.
    pub block: &'static [(&'static str, &'static str)],
    /// String delimiters. Comment markers inside strings are ignored.
    pub quotes: &'static [char],
    /// `(open, close)` pairs of strings that may span lines.
    pub multiline_quotes: &'static [(&'static str, &'static str)],
    pub grammar: Option<Grammar>,
}

impl CommentSyntax {
    const fn parsed_by(self, grammar: Grammar) -> Self {
        Self {
            grammar: Some(grammar),
            ..self
        }
    }
}

const C_LIKE: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: &[("/*", "*/")],
    quotes: &['"', '\''],
    multiline_quotes: &[("\"\"\"", "\"\"\""), ("`", "`")],
    grammar: None,
};

const PHP: CommentSyntax = CommentSyntax {
    line: &["//", "#"],
    block: &[("/*", "*/")],
    quotes: &['"', '\''],
    multiline_quotes: &[],
    grammar: None,
};

const CSS: CommentSyntax = CommentSyntax {
    line: &[],
    block: &[("/*", "*/")],
    quotes: &['"', '\''],
    multiline_quotes: &[],
    grammar: None,
};

const HASH: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: &[],
    quotes: &['"', '\''],
    multiline_quotes: &[("\"\"\"", "\"\"\""), ("'''", "'''")],
    grammar: None,
};

const SQL: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: &[("/*", "*/")],
    quotes: &['\''],
    multiline_quotes: &[],
    grammar: None,
};

const LUA: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: &[("--[[", "]]")],
    quotes: &['"', '\''],
    multiline_quotes: &[("[[", "]]")],
    grammar: None,
};

const MARKUP: CommentSyntax = CommentSyntax {
    line: &[],
    block: &[("<!--", "-->")],
    quotes: &[],
    multiline_quotes: &[],
    grammar: None,
};

const MARKDOWN: CommentSyntax = CommentSyntax {
    line: &["[//]: #"],
    block: &[("<!--", "-->")],
    quotes: &[],
    multiline_quotes: &[],
    grammar: None,
};

// <block keep-sorted="asc" keep-sorted-pattern='^\("([\w+]+)"'>
const BUILTIN: &[(&str, CommentSyntax)] = &[
    ("bash", HASH.parsed_by(Grammar::Bash)),
    ("c", C_LIKE.parsed_by(Grammar::C)),
    ("cc", C_LIKE.parsed_by(Grammar::Cpp)),
    ("cjs", C_LIKE.parsed_by(Grammar::JavaScript)),
    ("cmake", HASH),
    ("cpp", C_LIKE.parsed_by(Grammar::Cpp)),
    ("cs", C_LIKE.parsed_by(Grammar::CSharp)),
    ("css", CSS.parsed_by(Grammar::Css)),
    ("cxx", C_LIKE.parsed_by(Grammar::Cpp)),
    ("dart", C_LIKE),
    ("go", C_LIKE.parsed_by(Grammar::Go)),
    ("h", C_LIKE.parsed_by(Grammar::Cpp)),
    ("hpp", C_LIKE.parsed_by(Grammar::Cpp)),
    ("htm", MARKUP.parsed_by(Grammar::Html)),
    ("html", MARKUP.parsed_by(Grammar::Html)),
    ("java", C_LIKE.parsed_by(Grammar::Java)),
    ("js", C_LIKE.parsed_by(Grammar::JavaScript)),
    ("jsx", C_LIKE.parsed_by(Grammar::JavaScript)),
    ("kt", C_LIKE),
    ("kts", C_LIKE),
    ("less", CSS),
    ("lua", LUA),
    ("markdown", MARKDOWN),
    ("md", MARKDOWN),
    ("mjs", C_LIKE.parsed_by(Grammar::JavaScript)),
    ("mk", HASH),
    ("php", PHP.parsed_by(Grammar::Php)),
    ("pl", HASH),
    ("proto", C_LIKE),
    ("py", HASH.parsed_by(Grammar::Python)),
    ("pyi", HASH.parsed_by(Grammar::Python)),
    ("r", HASH),
    ("rb", HASH.parsed_by(Grammar::Ruby)),
    ("rs", C_LIKE.parsed_by(Grammar::Rust)),
    ("scala", C_LIKE),
    ("scss", CSS),
    ("sh", HASH.parsed_by(Grammar::Bash)),
    ("sql", SQL),
    ("svg", MARKUP),
    ("swift", C_LIKE),
    ("tf", HASH),
    ("toml", HASH.parsed_by(Grammar::Toml)),
    ("ts", C_LIKE.parsed_by(Grammar::TypeScript)),
    ("tsx", C_LIKE.parsed_by(Grammar::Tsx)),
    ("vue", MARKUP),
    ("xml", MARKUP),
    ("yaml", HASH.parsed_by(Grammar::Yaml)),
    ("yml", HASH.parsed_by(Grammar::Yaml)),
    ("zsh", HASH.parsed_by(Grammar::Bash)),
];
// </block>

/// Files without an extension that are still recognized, mapped to an extension.
const FILE_NAMES: &[(&str, &str)] = &[
    ("Dockerfile", "mk"),
    ("GNUmakefile", "mk"),
    ("Makefile", "mk"),
];

/// File extension to comment syntax registry.
#[derive(Debug, Clone)]
pub struct Languages {
    by_extension: HashMap<String, CommentSyntax>,
}

impl Languages {
    pub fn builtin() -> Self {
        Self {
            by_extension: BUILTIN
                .iter()
                .map(|(ext, syntax)| (ext.to_string(), *syntax))
                .collect(),
        }
    }

    pub fn supported_extensions() -> HashSet<&'static str> {
        BUILTIN.iter().map(|(ext, _)| *ext).collect()
    }

    /// Built-in languages plus `KEY=VALUE` mappings where files ending in `.KEY` use the
    /// syntax of `.VALUE`.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut languages = Self::builtin();
        for (key, value) in overrides {
            let syntax = BUILTIN
                .iter()
                .find(|(ext, _)| *ext == value.as_str())
                .map(|(_, syntax)| *syntax)
                .ok_or_else(|| GuardError::InvalidConfigValueError {
                    field: "extensions".to_string(),
                    value: format!("{}={}", key, value),
                    reason: format!("Unsupported extension: {}", value),
                })?;
            languages.by_extension.insert(key.clone(), syntax);
        }
        Ok(languages)
    }

    pub fn syntax_for(&self, path: &str) -> Option<CommentSyntax> {
        let path = Path::new(path);
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            if let Some(syntax) = self.by_extension.get(extension) {
                return Some(*syntax);
            }
        }
        let file_name = path.file_name()?.to_str()?;
        FILE_NAMES
            .iter()
            .find(|(name, _)| *name == file_name)
            .and_then(|(_, ext)| self.by_extension.get(*ext).copied())
    }
}

impl Default for Languages {
    fn default() -> Self {
        Self::builtin()
    }
}
