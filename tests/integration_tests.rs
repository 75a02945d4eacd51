use clap::Parser;
use sortguard::config::toml_config::FileConfig;
use sortguard::utils::validation::Validate;
use sortguard::{CheckEngine, CliConfig, GuardError, LocalSource, Settings};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const KEEP_SORTED_PY: &str = include_str!("testdata/keep_sorted.py");
const README_MD: &str = include_str!("testdata/README.md");
const LIB_RS: &str = include_str!("testdata/lib.rs");

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/keep_sorted.py"), KEEP_SORTED_PY).unwrap();
    fs::write(root.join("README.md"), README_MD).unwrap();
    fs::write(root.join("src/lib.rs"), LIB_RS).unwrap();
    fs::write(root.join("notes.txt"), "<block>\n").unwrap();
    dir
}

fn settings(args: &[&str]) -> Settings {
    let cli = CliConfig::try_parse_from(std::iter::once("sortguard").chain(args.iter().copied()))
        .unwrap();
    cli.validate().unwrap();
    Settings::merge(FileConfig::default(), &cli)
}

fn engine(root: &Path, args: &[&str]) -> CheckEngine<LocalSource, Settings> {
    CheckEngine::new(LocalSource::new(root), settings(args)).unwrap()
}

fn lines_of(report: &sortguard::Report, file: &str) -> Vec<(usize, String)> {
    report.violations[file]
        .iter()
        .map(|v| (v.range.start.line, v.code.clone()))
        .collect()
}

#[tokio::test]
async fn test_check_reports_violations_in_all_files() {
    let dir = workspace();
    let engine = engine(dir.path(), &[]);

    let report = engine.run_paths(&[".".to_string()]).await.unwrap();

    assert_eq!(
        report.violations.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["README.md", "data/keep_sorted.py"]
    );
    assert_eq!(
        lines_of(&report, "data/keep_sorted.py"),
        vec![
            (13, "keep-sorted".to_string()),
            (29, "keep-sorted".to_string()),
            (52, "keep-sorted".to_string()),
        ]
    );
    assert_eq!(
        lines_of(&report, "README.md"),
        vec![(10, "keep-unique".to_string())]
    );
    assert!(report.has_errors());
}

#[tokio::test]
async fn test_check_output_is_lsp_like_json() {
    let dir = workspace();
    let engine = engine(dir.path(), &["-e", "keep-unique"]);

    let report = engine.run_paths(&["README.md".to_string()]).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "README.md": [{
                "range": {
                    "start": {"line": 10, "character": 1},
                    "end": {"line": 10, "character": 8}
                },
                "code": "keep-unique",
                "message": "Block README.md:maintainers defined at line 7 has a duplicated line 10",
                "severity": 1,
                "data": {"first_seen_at_line": 8}
            }]
        })
    );
}

#[tokio::test]
async fn test_diff_mode_checks_only_modified_blocks() {
    let dir = workspace();
    let engine = engine(dir.path(), &[]);

    let patch = "\
diff --git a/README.md b/README.md
index 1111111..2222222 100644
--- a/README.md
+++ b/README.md
@@ -3,3 +3,3 @@
 <!-- <block name=\"usage\" affects=\"src/lib.rs:api\"> -->
-Run `sortguard` to validate every block.
+Run `sortguard check` to validate every block.
 <!-- </block> -->
";
    let report = engine.run_diff(patch).await.unwrap();

    let violations = &report.violations["README.md"];
    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0].message,
        "Block README.md:usage at line 3 is modified, but src/lib.rs:api is not"
    );
}

#[tokio::test]
async fn test_diff_mode_with_both_sides_modified() {
    let dir = workspace();
    let engine = engine(dir.path(), &[]);

    let patch = "\
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -4,1 +4,1 @@
-Run it.
+Run `sortguard check` to validate every block.
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -2,1 +2,1 @@
-pub fn check() { todo!() }
+pub fn check() {}
";
    let report = engine.run_diff(patch).await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_fix_sorts_blocks_in_place() {
    let dir = workspace();
    let engine = engine(dir.path(), &["--fix", "-d", "keep-unique"]);

    let report = engine.run_paths(&["data".to_string()]).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.fixed_files, vec!["data/keep_sorted.py".to_string()]);
    let fixed = fs::read_to_string(dir.path().join("data/keep_sorted.py")).unwrap();
    assert!(fixed.contains("    'tomato',\n    'potato',\n    'lettuce',\n"));
    assert!(fixed.contains(
        "    \"id: 1 apple\",\n    \"id: 10 orange\",\n    \"id: 3 cherry\",\n"
    ));
    assert!(fixed.contains("    'a',\n    'b',\n    'c'\n"));
    assert_eq!(fixed.lines().count(), KEEP_SORTED_PY.lines().count());
}

#[tokio::test]
async fn test_ignore_and_disable() {
    let dir = workspace();
    let engine = engine(
        dir.path(),
        &["-d", "keep-unique", "check", "--ignore", "data/"],
    );

    let report = engine.run_paths(&[".".to_string()]).await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_list_blocks() {
    let dir = workspace();
    let engine = engine(dir.path(), &[]);

    let listing = engine.list(&["src".to_string()]).await.unwrap();
    let json = serde_json::to_value(&listing).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "src/lib.rs": [
                {
                    "name": "api",
                    "line": 1,
                    "column": 4,
                    "attributes": {"affects": "README.md:usage", "name": "api"}
                },
                {
                    "line": 6,
                    "column": 8,
                    "attributes": {"keep-sorted": "", "line-pattern": "\"[a-z]+\","}
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_unclosed_block_is_a_parse_error() {
    let dir = workspace();
    fs::write(dir.path().join("src/broken.rs"), "// <block>\nfn f() {}\n").unwrap();
    let engine = engine(dir.path(), &[]);

    let err = engine.run_paths(&["src".to_string()]).await.unwrap_err();

    assert!(matches!(&err, GuardError::ParseError { file, .. } if file == "src/broken.rs"));
    assert_eq!(
        err.to_string(),
        "Failed to parse blocks in src/broken.rs: Block at line 1 is not closed"
    );
}

#[tokio::test]
async fn test_invalid_attribute_is_a_configuration_error() {
    let dir = workspace();
    fs::write(
        dir.path().join("src/bad.rs"),
        "// <block keep-sorted=\"sideways\">\n// </block>\n",
    )
    .unwrap();
    let engine = engine(dir.path(), &[]);

    let err = engine.run_paths(&["src/bad.rs".to_string()]).await.unwrap_err();
    assert_eq!(
        err.category(),
        sortguard::utils::error::ErrorCategory::Configuration
    );
}

#[tokio::test]
async fn test_config_file_is_merged() {
    let dir = workspace();
    fs::write(
        dir.path().join(".sortguard.toml"),
        "[validators]\ndisabled = [\"keep-sorted\"]\n\n[paths]\nignore = [\"README.md\"]\n",
    )
    .unwrap();

    let file_config = FileConfig::from_file(dir.path().join(".sortguard.toml")).unwrap();
    file_config.validate().unwrap();
    let cli = CliConfig::try_parse_from(["sortguard", "check"]).unwrap();
    let settings = Settings::merge(file_config, &cli);
    let engine = CheckEngine::new(LocalSource::new(dir.path()), settings).unwrap();

    let report = engine.run_paths(&[".".to_string()]).await.unwrap();
    assert!(report.is_empty());
}
