use anyhow::Context;
use clap::Parser;
use sortguard::config::cli::find_repository_root;
use sortguard::config::toml_config::{FileConfig, DEFAULT_CONFIG_FILE};
use sortguard::config::Command;
use sortguard::utils::{logger, validation::Validate};
use sortguard::{CheckEngine, CliConfig, GuardError, LocalSource, Report, Settings};
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::debug!("CLI config: {:?}", config);

    match run(config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            let Some(error) = e.downcast_ref::<GuardError>() else {
                tracing::error!("❌ sortguard failed: {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(3);
            };
            tracing::error!(
                "❌ sortguard failed: {} (Category: {:?}, Severity: {:?})",
                error,
                error.category(),
                error.severity()
            );
            eprintln!("❌ {}", error.user_friendly_message());
            eprintln!("💡 {}", error.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼，1 保留給違規
            let exit_code = error.severity().exit_code();
            std::process::exit(exit_code);
        }
    }
}

async fn run(config: CliConfig) -> anyhow::Result<i32> {
    config.validate()?;

    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let repository_root = find_repository_root(&cwd);

    let file_config = match &config.config {
        Some(path) => FileConfig::from_file(path)?,
        None => {
            let root = repository_root.as_deref().unwrap_or(cwd.as_path());
            FileConfig::from_file_if_exists(root.join(DEFAULT_CONFIG_FILE))?
        }
    };
    file_config.validate()?;

    let settings = Settings::merge(file_config, &config);
    settings.validate()?;
    tracing::debug!("Settings: {:?}", settings);

    let base_path = match &config.command {
        // diff 內的路徑相對於 repository 根目錄
        None => repository_root?,
        Some(_) => cwd,
    };
    tracing::info!("Using {} as base path", base_path.display());
    let engine = CheckEngine::new(LocalSource::new(base_path), settings)?;

    match &config.command {
        Some(Command::List(args)) => {
            let listing = engine.list(&args.paths).await?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(0)
        }
        Some(Command::Check(args)) => {
            let report = engine.run_paths(&args.paths).await?;
            print_report(&report)
        }
        None => {
            let mut patch = String::new();
            tokio::io::stdin()
                .read_to_string(&mut patch)
                .await
                .context("failed to read the diff from stdin")?;
            let report = engine.run_diff(&patch).await?;
            print_report(&report)
        }
    }
}

fn print_report(report: &Report) -> anyhow::Result<i32> {
    for file in &report.fixed_files {
        tracing::info!("✅ Fixed {}", file);
    }
    if report.is_empty() {
        tracing::info!("✅ No violations found");
        return Ok(0);
    }

    tracing::info!("Found {} violations", report.violation_count());
    eprintln!("{}", report.to_json_pretty()?);
    Ok(if report.has_errors() { 1 } else { 0 })
}
