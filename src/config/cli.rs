use crate::core::engine::is_ignored;
use crate::core::SourceStore;
use crate::utils::error::{GuardError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Directories never walked into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

/// Source files on the local file system, relative to `base_path`.
#[derive(Debug, Clone)]
pub struct LocalSource {
    base_path: PathBuf,
}

impl LocalSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl SourceStore for LocalSource {
    async fn read_to_string(&self, path: &str) -> Result<String> {
        let full_path = self.base_path.join(path);
        Ok(tokio::fs::read_to_string(full_path).await?)
    }

    async fn write(&self, path: &str, contents: &str) -> Result<()> {
        let full_path = self.base_path.join(path);
        tokio::fs::write(full_path, contents).await?;
        Ok(())
    }

    async fn list_files(&self, paths: &[String], ignore: &[String]) -> Result<Vec<String>> {
        let mut files = BTreeSet::new();
        for path in paths {
            let relative = normalize(path);
            if is_ignored(&relative, ignore) {
                continue;
            }
            let metadata = tokio::fs::metadata(self.base_path.join(&relative)).await?;
            if metadata.is_file() {
                files.insert(relative);
                continue;
            }

            let mut pending = vec![relative];
            while let Some(dir) = pending.pop() {
                let mut entries = tokio::fs::read_dir(self.base_path.join(&dir)).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.starts_with('.') {
                        continue;
                    }
                    let child = if dir.is_empty() {
                        name.clone()
                    } else {
                        format!("{}/{}", dir, name)
                    };
                    if is_ignored(&child, ignore) {
                        continue;
                    }
                    let file_type = entry.file_type().await?;
                    if file_type.is_dir() {
                        if !SKIPPED_DIRS.contains(&name.as_str()) {
                            pending.push(child);
                        }
                    } else if file_type.is_file() {
                        files.insert(child);
                    }
                }
            }
        }
        tracing::debug!("Collected {} files", files.len());
        Ok(files.into_iter().collect())
    }
}

/// `./src/` → `src`, `.` → ``.
fn normalize(path: &str) -> String {
    let mut path = path.trim_end_matches('/');
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    if path == "." {
        String::new()
    } else {
        path.to_string()
    }
}

/// Nearest ancestor of `start` (itself included) that contains `.git`.
pub fn find_repository_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            GuardError::config(format!(
                "{} is not inside a git repository",
                start.display()
            ))
        })
}
