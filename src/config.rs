use crate::services::plan_analyzer::RuleEngineConfig;
use crate::services::plan_analyzer::analyzer::rules::{get_node_rules, get_statement_rules};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub output: OutputConfig,
    pub analyzer: RuleEngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Report format written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unsupported output format: {}", other)),
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "plan-advisor")]
#[command(version, about = "Plan Advisor - execution plan diagnostics")]
pub struct CommandLineArgs {
    /// Plan documents (JSON) to analyze
    #[arg(value_name = "PLAN", required = true)]
    pub plans: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (overrides config file, e.g., "info,plan_advisor=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Output format (overrides config file)
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the annotated plan to this file (json format, single input only)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Rule id to skip, may be repeated (e.g., --disable-rule N009)
    #[arg(long = "disable-rule", value_name = "ID")]
    pub disabled_rules: Vec<String>,
}

/// Messages produced while loading configuration
///
/// Loading runs before the subscriber is installed, so entries are held here and
/// emitted once logging is up.
#[derive(Debug, Default)]
pub struct LoadLog {
    entries: Vec<(Level, String)>,
}

impl LoadLog {
    fn info(&mut self, message: String) {
        self.entries.push((Level::INFO, message));
    }

    fn warn(&mut self, message: String) {
        self.entries.push((Level::WARN, message));
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, m)| m.as_str())
    }

    /// Log every buffered message through the installed subscriber
    pub fn emit(self) {
        for (level, message) in self.entries {
            if level == Level::WARN {
                tracing::warn!("{}", message);
            } else {
                tracing::info!("{}", message);
            }
        }
    }
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load(cli_args: &CommandLineArgs) -> Result<(Self, LoadLog), anyhow::Error> {
        let mut log = LoadLog::default();

        // 1. Load from config file (use CLI --config if provided, otherwise find default)
        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            log.info(format!("Loading configuration from {}", config_path));
            Self::from_toml(&config_path)?
        } else {
            log.warn("Configuration file not found, using defaults".to_string());
            Config::default()
        };

        // 2. Override with environment variables
        config.apply_env_overrides(&mut log);

        // 3. Override with command line arguments (highest priority)
        config.apply_cli_overrides(cli_args, &mut log);

        // 4. Validate configuration
        config.validate(&mut log)?;

        Ok((config, log))
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,plan_advisor=debug")
    /// - APP_LOG_FILE: Log file path (daily rolling)
    /// - APP_OUTPUT_FORMAT: Output format ("text" or "json")
    /// - APP_DISABLED_RULES: Comma-separated rule ids to skip (e.g., "N001,N009")
    fn apply_env_overrides(&mut self, log: &mut LoadLog) {
        self.apply_overrides_from(log, |key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, log: &mut LoadLog, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("APP_LOG_LEVEL") {
            self.logging.level = level;
            log.info(format!("Override logging.level from env: {}", self.logging.level));
        }

        if let Some(file) = lookup("APP_LOG_FILE") {
            self.logging.file = Some(file).filter(|f| !f.is_empty());
            log.info(format!("Override logging.file from env: {:?}", self.logging.file));
        }

        if let Some(format) = lookup("APP_OUTPUT_FORMAT") {
            match format.parse() {
                Ok(val) => {
                    self.output.format = val;
                    log.info(format!("Override output.format from env: {:?}", self.output.format));
                },
                Err(e) => log.warn(format!(
                    "Invalid APP_OUTPUT_FORMAT '{}': {} (keep {:?})",
                    format, e, self.output.format
                )),
            }
        }

        if let Some(rules) = lookup("APP_DISABLED_RULES") {
            self.analyzer.disabled_rules.extend(
                rules
                    .split(',')
                    .map(|r| r.trim().to_uppercase())
                    .filter(|r| !r.is_empty()),
            );
            log.info(format!(
                "Override analyzer.disabled_rules from env: {:?}",
                self.analyzer.disabled_rules
            ));
        }
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs, log: &mut LoadLog) {
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            log.info(format!("Override logging.level from CLI: {}", self.logging.level));
        }

        if let Some(format) = args.format {
            self.output.format = format;
            log.info(format!("Override output.format from CLI: {:?}", self.output.format));
        }

        if !args.disabled_rules.is_empty() {
            self.analyzer
                .disabled_rules
                .extend(args.disabled_rules.iter().map(|r| r.trim().to_uppercase()));
            log.info(format!(
                "Override analyzer.disabled_rules from CLI: {:?}",
                self.analyzer.disabled_rules
            ));
        }
    }

    /// Validate configuration
    fn validate(&self, log: &mut LoadLog) -> Result<(), anyhow::Error> {
        if self.logging.level.trim().is_empty() {
            anyhow::bail!("logging.level cannot be empty");
        }

        self.analyzer.thresholds.validate()?;

        let known: Vec<String> = get_statement_rules()
            .iter()
            .map(|r| r.id().to_string())
            .chain(get_node_rules().iter().map(|r| r.id().to_string()))
            .collect();
        for rule in &self.analyzer.disabled_rules {
            if !known.contains(rule) {
                log.warn(format!("Unknown rule id in analyzer.disabled_rules: {}", rule));
            }
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn,plan_advisor=info".to_string(), file: None }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn split_number_unit(input: &str) -> Result<(u64, String), String> {
    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.trim().is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    Ok((n, unit.trim().to_string()))
}

fn parse_duration_to_ms(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as milliseconds)
    if let Ok(val) = input.trim().parse::<u64>() {
        return Ok(val);
    }

    let (n, unit) = split_number_unit(input)?;
    let factor = match unit.as_str() {
        "ms" | "msec" | "millis" | "milliseconds" => 1,
        "s" | "sec" | "secs" | "second" | "seconds" => 1000,
        "m" | "min" | "mins" | "minute" | "minutes" => 60 * 1000,
        _ => return Err(format!("unsupported unit: {}", unit)),
    };
    n.checked_mul(factor).ok_or_else(|| format!("duration out of range: {}", input.trim()))
}

fn parse_size_to_kb(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as KB)
    if let Ok(val) = input.trim().parse::<u64>() {
        return Ok(val);
    }

    let (n, unit) = split_number_unit(input)?;
    let factor = match unit.as_str() {
        "k" | "kb" => 1,
        "m" | "mb" => 1024,
        "g" | "gb" => 1024 * 1024,
        _ => return Err(format!("unsupported unit: {}", unit)),
    };
    n.checked_mul(factor).ok_or_else(|| format!("size out of range: {}", input.trim()))
}

// Custom serde deserializers to support numeric or human-friendly string values
pub(crate) fn deserialize_duration_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(UnitVisitor {
        expecting: "a number of milliseconds or a string like '500ms', '5s'",
        parse: parse_duration_to_ms,
    })
}

pub(crate) fn deserialize_size_kb<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(UnitVisitor {
        expecting: "a number of KB or a string like '512KB', '4MB', '1GB'",
        parse: parse_size_to_kb,
    })
}

struct UnitVisitor {
    expecting: &'static str,
    parse: fn(&str) -> Result<u64, String>,
}

impl<'de> serde::de::Visitor<'de> for UnitVisitor {
    type Value = u64;
    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.expecting)
    }
    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v)
    }
    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
    }
    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        (self.parse)(v).map_err(E::custom)
    }
}
