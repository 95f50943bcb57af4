//! Runtime configuration
//!
//! Values resolve in precedence order: command-line flag (or its environment
//! variable) over config file over built-in default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";
pub const DEFAULT_MODEL: &str = "qwen3-4b";
pub const DEFAULT_PACE_MS: u64 = 1000;
pub const DEFAULT_REPORTS_DIR: &str = "generated_reports";

/// Deep Research - stream multi-step AI research runs to the browser
#[derive(Parser, Debug, Default)]
#[command(name = "deep-research")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port to bind the server to
    #[arg(long, env = "DEEP_RESEARCH_PORT")]
    pub port: Option<u16>,

    /// Address to bind the server to
    #[arg(long, env = "DEEP_RESEARCH_BIND")]
    pub bind: Option<String>,

    /// Base URL of the LM Studio (OpenAI-compatible) endpoint
    #[arg(long, env = "DEEP_RESEARCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Model identifier to run research with
    #[arg(long, env = "DEEP_RESEARCH_MODEL")]
    pub model: Option<String>,

    /// Cosmetic delay in milliseconds between fixed workflow steps
    /// (0 disables pacing)
    #[arg(long, env = "DEEP_RESEARCH_PACE_MS")]
    pub pace_ms: Option<u64>,

    /// Directory where saved reports are written
    #[arg(long, env = "DEEP_RESEARCH_REPORTS_DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Optional TOML config file; flags and env vars take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Optional config-file fields, all overridable from the CLI.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub pace_ms: Option<u64>,
    pub reports_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &PathBuf) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub base_url: String,
    pub model: String,
    pub pace: Duration,
    pub reports_dir: PathBuf,
}

impl Config {
    pub fn resolve(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    fn merge(cli: Cli, file: FileConfig) -> Self {
        Self {
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            bind: cli
                .bind
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            base_url: cli
                .base_url
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: cli
                .model
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            pace: Duration::from_millis(cli.pace_ms.or(file.pace_ms).unwrap_or(DEFAULT_PACE_MS)),
            reports_dir: cli
                .reports_dir
                .or(file.reports_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR)),
        }
    }
}
