use crate::core::blocks::{BlocksParser, CommentBlocksParser};
use crate::core::diff;
use crate::core::fixer::fix_keep_sorted;
use crate::core::languages::Languages;
use crate::domain::model::{Block, FileBlocks, Severity, ValidationContext, Violation};
use crate::domain::ports::{ConfigProvider, SourceStore};
use crate::utils::error::{GuardError, Result};
use crate::validators;
use crate::validators::affects::{parse_affects_attribute, AFFECTS};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Violations of a run, grouped by file path.
#[derive(Debug, Default)]
pub struct Report {
    pub violations: BTreeMap<String, Vec<Violation>>,
    /// Files rewritten by `--fix`.
    pub fixed_files: Vec<String>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.violations.values().all(Vec::is_empty)
    }

    pub fn violation_count(&self) -> usize {
        self.violations.values().map(Vec::len).sum()
    }

    /// Whether any violation has error severity.
    pub fn has_errors(&self) -> bool {
        self.violations
            .values()
            .flatten()
            .any(|violation| violation.severity == Severity::Error)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.violations)?)
    }
}

/// A block as printed by `list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub line: usize,
    pub column: usize,
    pub attributes: BTreeMap<String, String>,
}

impl From<&Block> for ListedBlock {
    fn from(block: &Block) -> Self {
        let start = block.start_tag.start();
        Self {
            name: block.name().map(str::to_string),
            line: start.line,
            column: start.character,
            attributes: block.attributes.clone(),
        }
    }
}

pub type BlockListing = BTreeMap<String, Vec<ListedBlock>>;

/// Whether `path` is one of the `ignore` paths or inside one of them.
pub fn is_ignored(path: &str, ignore: &[String]) -> bool {
    let path = path.trim_start_matches("./");
    ignore.iter().any(|prefix| {
        let prefix = prefix.trim_start_matches("./").trim_end_matches('/');
        !prefix.is_empty()
            && (path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}

pub struct CheckEngine<S: SourceStore, C: ConfigProvider> {
    store: S,
    config: C,
    languages: Languages,
}

impl<S: SourceStore, C: ConfigProvider> CheckEngine<S, C> {
    pub fn new(store: S, config: C) -> Result<Self> {
        let languages = Languages::with_overrides(config.extensions())?;
        Ok(Self {
            store,
            config,
            languages,
        })
    }

    /// Checks the blocks intersecting the lines changed by a unified diff.
    pub async fn run_diff(&self, patch: &str) -> Result<Report> {
        let modified = diff::parse_modified_lines(patch)?;
        tracing::info!("Diff modifies {} files", modified.len());

        let mut selected = HashMap::new();
        let mut fixed_files = Vec::new();
        for (path, ranges) in &modified {
            if is_ignored(path, self.config.ignore_paths()) {
                tracing::debug!("Ignoring {}", path);
                continue;
            }
            let Some(parser) = self.parser_for(path) else {
                tracing::debug!("Skipping {}: unsupported language", path);
                continue;
            };
            let contents = self.store.read_to_string(path).await?;
            let (file_blocks, fixed) = self
                .prepare_file(path, contents, &parser, |block| block.intersects_any(ranges))
                .await?;
            if fixed {
                fixed_files.push(path.clone());
            }
            if let Some(file_blocks) = file_blocks {
                selected.insert(path.clone(), file_blocks);
            }
        }

        self.validate(selected, fixed_files, false).await
    }

    /// Checks every block of the files under `paths`.
    pub async fn run_paths(&self, paths: &[String]) -> Result<Report> {
        let files = self
            .store
            .list_files(paths, self.config.ignore_paths())
            .await?;
        tracing::info!("Checking {} files", files.len());

        let mut selected = HashMap::new();
        let mut fixed_files = Vec::new();
        for path in files {
            let Some(parser) = self.parser_for(&path) else {
                continue;
            };
            let contents = self.store.read_to_string(&path).await?;
            let (file_blocks, fixed) = self
                .prepare_file(&path, contents, &parser, |_| true)
                .await?;
            if fixed {
                fixed_files.push(path.clone());
            }
            if let Some(file_blocks) = file_blocks {
                selected.insert(path, file_blocks);
            }
        }

        self.validate(selected, fixed_files, true).await
    }

    /// Lists the blocks of the files under `paths`.
    pub async fn list(&self, paths: &[String]) -> Result<BlockListing> {
        let files = self
            .store
            .list_files(paths, self.config.ignore_paths())
            .await?;

        let mut listing = BlockListing::new();
        for path in files {
            let Some(parser) = self.parser_for(&path) else {
                continue;
            };
            let contents = self.store.read_to_string(&path).await?;
            let blocks = parse_blocks(&path, &contents, &parser)?;
            if !blocks.is_empty() {
                listing.insert(path, blocks.iter().map(ListedBlock::from).collect());
            }
        }
        Ok(listing)
    }

    fn parser_for(&self, path: &str) -> Option<CommentBlocksParser> {
        self.languages.syntax_for(path).map(CommentBlocksParser::new)
    }

    /// Parses `contents`, applies `--fix` to the selected blocks and returns those
    /// blocks, `None` when none were selected.
    async fn prepare_file(
        &self,
        path: &str,
        contents: String,
        parser: &CommentBlocksParser,
        selected: impl Fn(&Block) -> bool,
    ) -> Result<(Option<FileBlocks>, bool)> {
        let mut contents = contents;
        let mut blocks = parse_blocks(path, &contents, parser)?;
        let mut fixed = false;

        if self.config.fix() {
            let outcome = fix_keep_sorted(path, &contents, &blocks, &selected)?;
            if outcome.is_changed() {
                self.store.write(path, &outcome.contents).await?;
                tracing::info!("Fixed {} blocks in {}", outcome.fixed_blocks, path);
                contents = outcome.contents;
                // 行號不變，重新解析後以相同條件選取
                blocks = parse_blocks(path, &contents, parser)?;
                fixed = true;
            }
        }

        let blocks: Vec<Block> = blocks.into_iter().filter(|block| selected(block)).collect();
        tracing::debug!("{}: {} blocks selected", path, blocks.len());
        if blocks.is_empty() {
            return Ok((None, fixed));
        }
        Ok((
            Some(FileBlocks::new(path.to_string(), contents, blocks)),
            fixed,
        ))
    }

    /// Runs the selected validators. With `every_block_modified`, blocks of files outside
    /// the run that `affects` attributes point to count as modified too.
    async fn validate(
        &self,
        selected: HashMap<String, FileBlocks>,
        fixed_files: Vec<String>,
        every_block_modified: bool,
    ) -> Result<Report> {
        let validators = validators::select(
            self.config.enabled_validators(),
            self.config.disabled_validators(),
        );
        tracing::debug!(
            "Running {} validators on {} files",
            validators.len(),
            selected.len()
        );
        let referenced =
            if every_block_modified && validators.iter().any(|v| v.name() == AFFECTS) {
                self.referenced_block_names(&selected).await?
            } else {
                HashSet::new()
            };
        let mut context = ValidationContext::new(selected);
        context.modified_names.extend(referenced);

        let violations = validators::run(Arc::new(context), validators).await?;
        Ok(Report {
            violations,
            fixed_files,
        })
    }

    /// `(file, name)` of the named blocks in files that `affects` attributes reference
    /// but that are not part of `selected`.
    async fn referenced_block_names(
        &self,
        selected: &HashMap<String, FileBlocks>,
    ) -> Result<HashSet<(String, String)>> {
        let mut targets = BTreeSet::new();
        for (path, file_blocks) in selected {
            for block in &file_blocks.blocks {
                let Some(value) = block.attribute(AFFECTS) else {
                    continue;
                };
                for (file, _) in parse_affects_attribute(path, block, value)? {
                    if let Some(file) = file.filter(|file| !selected.contains_key(*file)) {
                        targets.insert(file.to_string());
                    }
                }
            }
        }

        let mut names = HashSet::new();
        for target in targets {
            let Some(parser) = self.parser_for(&target) else {
                continue;
            };
            let contents = match self.store.read_to_string(&target).await {
                Ok(contents) => contents,
                Err(GuardError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("Referenced file {} does not exist", target);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let blocks = match parse_blocks(&target, &contents, &parser) {
                Ok(blocks) => blocks,
                Err(e) => {
                    tracing::warn!("Ignoring blocks of referenced file: {}", e);
                    continue;
                }
            };
            names.extend(
                blocks
                    .iter()
                    .filter_map(|block| block.name().map(|name| (target.clone(), name.to_string()))),
            );
        }
        Ok(names)
    }
}

fn parse_blocks(path: &str, contents: &str, parser: &CommentBlocksParser) -> Result<Vec<Block>> {
    parser.parse(contents).map_err(|e| match e {
        GuardError::UnclosedBlockError { .. } | GuardError::UnexpectedEndTagError { .. } => {
            GuardError::ParseError {
                file: path.to_string(),
                message: e.to_string(),
            }
        }
        other => other,
    })
}
