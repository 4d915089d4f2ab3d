use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ai::inference::API_KEY_ENV;
use crate::browser::loader::LoadOptions;
use crate::browser::session::LaunchOptions;
use crate::crawl::crawler::CrawlOptions;
use crate::error::CrawlError;
use crate::extract::extractor::ExtractOptions;
use crate::runner::script_runner::RunnerOptions;

pub const DEFAULT_CONFIG_FILE: &str = "form-crawler.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-crawler",
    version,
    about = "Web form crawler and test-case generator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Debug logging for this crate
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to config file (default: form-crawler.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Page load timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Rule,
    Openai,
    Ollama,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    Heuristic,
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Junit,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract form records from a page
    Crawl {
        /// Page to crawl
        url: String,

        /// Also search SPA containers, modals and trigger-revealed forms
        #[arg(long)]
        spa: bool,

        /// Write a forms CSV report
        #[arg(long)]
        csv: Option<String>,

        /// Write form records as JSON
        #[arg(long)]
        json: Option<String>,
    },

    /// Crawl a page and generate test cases, reports and scripts
    Generate {
        url: String,

        #[arg(long)]
        spa: bool,

        /// Test-case generator
        #[arg(long, value_enum)]
        generator: Option<GeneratorKind>,

        /// Form classifier used when the generator leaves the type open
        #[arg(long, value_enum)]
        classifier: Option<ClassifierKind>,

        /// Output root directory (default: test_cases)
        #[arg(long)]
        output_root: Option<String>,

        /// Hosted model API key
        #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
        api_key: Option<String>,

        /// Model name
        #[arg(long)]
        model: Option<String>,

        /// Model endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Run generated test scripts
    Run {
        /// Directory searched recursively for test_*.py (default: output root)
        #[arg(long)]
        dir: Option<String>,

        #[arg(long, value_enum, default_value = "console")]
        format: ReportFormat,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Per-script timeout in seconds
        #[arg(long)]
        script_timeout: Option<u64>,

        /// Run popup-tolerant fixed_ copies of each script
        #[arg(long)]
        harden: bool,
    },

    /// Explain why a page is slow, blocked or shows no forms
    Diagnose { url: String },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-crawler.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    pub server_script: Option<String>,
    pub node_binary: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 60,
            settle_ms: 3000,
            server_script: None,
            node_binary: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub spa: bool,

    #[serde(default = "default_max_containers")]
    pub max_input_containers: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            spa: false,
            max_input_containers: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_generator")]
    pub generator: GeneratorKind,

    #[serde(default = "default_classifier")]
    pub classifier: ClassifierKind,

    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub ollama_endpoint: Option<String>,
    pub ollama_model: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorKind::Openai,
            classifier: ClassifierKind::Heuristic,
            model: None,
            endpoint: None,
            ollama_endpoint: None,
            ollama_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_root")]
    pub root: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,

    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            script_timeout_secs: 90,
            pause_ms: 2000,
        }
    }
}

// Serde default helpers
fn default_true() -> bool { true }
fn default_timeout_secs() -> u64 { 60 }
fn default_settle_ms() -> u64 { 3000 }
fn default_max_containers() -> usize { 5 }
fn default_generator() -> GeneratorKind { GeneratorKind::Openai }
fn default_classifier() -> ClassifierKind { ClassifierKind::Heuristic }
fn default_root() -> String { "test_cases".to_string() }
fn default_python() -> String { "python".to_string() }
fn default_script_timeout() -> u64 { 90 }
fn default_pause_ms() -> u64 { 2000 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Parse a config file. `Ok(None)` when the file does not exist.
pub fn try_load_config(path: &str) -> Result<Option<AppConfig>, CrawlError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CrawlError::io(path, e)),
    };
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|e| CrawlError::Config {
            path: path.to_string(),
            message: e.to_string(),
        })
}

/// Load config from a YAML file. Returns defaults if the file is missing or
/// malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match try_load_config(config_path) {
        Ok(Some(config)) => config,
        Ok(None) => AppConfig::default(),
        Err(e) => {
            warn!("{}; using defaults", e);
            AppConfig::default()
        }
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Browser launch settings from the config file and `--headed`.
pub fn build_launch_options(headed: bool, config: &BrowserConfig) -> LaunchOptions {
    let mut options = LaunchOptions {
        headless: config.headless && !headed,
        ..LaunchOptions::default()
    };
    if let Some(script) = &config.server_script {
        options.server_script = script.clone();
    }
    if let Some(node) = &config.node_binary {
        options.node_binary = node.clone();
    }
    options
}

/// Load settings: `--timeout` wins over the config file.
pub fn build_load_options(timeout_secs: Option<u64>, config: &BrowserConfig) -> LoadOptions {
    LoadOptions {
        settle_ms: config.settle_ms,
        ..LoadOptions::with_timeout_secs(timeout_secs.unwrap_or(config.timeout_secs))
    }
}

pub fn build_crawl_options(timeout_secs: Option<u64>, spa: bool, config: &AppConfig) -> CrawlOptions {
    CrawlOptions {
        load: build_load_options(timeout_secs, &config.browser),
        extract: ExtractOptions {
            spa: spa || config.extract.spa,
            max_input_containers: config.extract.max_input_containers,
        },
        ..CrawlOptions::default()
    }
}

pub fn build_runner_options(
    script_timeout_secs: Option<u64>,
    harden: bool,
    config: &RunnerConfig,
) -> RunnerOptions {
    RunnerOptions {
        program: config.python.clone(),
        timeout: Duration::from_secs(script_timeout_secs.unwrap_or(config.script_timeout_secs)),
        pause: Duration::from_millis(config.pause_ms),
        harden,
        ..RunnerOptions::default()
    }
}
