use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plan_advisor::config::{CommandLineArgs, Config, LoggingConfig, OutputFormat};
use plan_advisor::services::plan_analyzer::{ParsedPlan, RuleEngine, document, report};

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();

    // Load configuration first
    let (config, load_log) = Config::load(&args)?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_logging(&config.logging);
    tracing::info!("plan-advisor starting up");
    load_log.emit();
    tracing::debug!("Configuration loaded: {:?}", config);

    if args.output.is_some() {
        if args.plans.len() != 1 {
            anyhow::bail!("--output requires exactly one plan document");
        }
        if config.output.format != OutputFormat::Json {
            anyhow::bail!("--output requires json output format");
        }
    }

    let engine = RuleEngine::with_config(config.analyzer.clone());
    let mut failed = 0usize;

    for path in &args.plans {
        let mut plan = match document::load_plan(path) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!("{}", e);
                eprintln!("error: {}", e);
                failed += 1;
                continue;
            },
        };

        engine.analyze(&mut plan);
        emit(&plan, path, &args, config.output.format)?;
    }

    if failed > 0 {
        anyhow::bail!("{} of {} plan documents could not be analyzed", failed, args.plans.len());
    }

    tracing::info!("Analyzed {} plan documents", args.plans.len());
    Ok(())
}

fn emit(
    plan: &ParsedPlan,
    path: &Path,
    args: &CommandLineArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", report::render_text(plan, &path.display().to_string()));
        },
        OutputFormat::Json => match &args.output {
            Some(output) => {
                document::write_plan(output, plan)?;
                tracing::info!("Annotated plan written to {}", output.display());
            },
            None => println!("{}", document::plan_to_json(plan)?),
        },
    }
    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let log_filter = tracing_subscriber::EnvFilter::new(&logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    // Add file logging if configured
    if let Some(log_file) = &logging.file {
        let log_path = Path::new(log_file);
        let log_dir = log_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");
        let _ = std::fs::create_dir_all(log_dir);

        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("plan-advisor.log");
        // Rolling appender adds a date suffix
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        Some(guard)
    } else {
        // stdout carries the report, so console logs go to stderr
        registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).init();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process
    #[test]
    fn test_init_logging_with_rolling_file() {
        let dir = std::env::temp_dir().join(format!("plan-advisor-logs-{}", std::process::id()));
        let logging = LoggingConfig {
            level: "info".to_string(),
            file: Some(dir.join("plan-advisor.log").to_string_lossy().to_string()),
        };

        let guard = init_logging(&logging);
        tracing::info!("logging initialized");

        assert!(guard.is_some());
        assert!(dir.is_dir());
        drop(guard);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
