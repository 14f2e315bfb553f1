//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::AnalyticsKey;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// fanquery - federated SPARQL template broker
///
/// Binds a catalogued query template and sends it to every registered
/// endpoint at once, then merges what comes back.
///
/// Examples:
///   fanquery --list
///   fanquery --template 5 --describe
///   fanquery --template 0 -p disease=NCIT:C34373
///   fanquery --template 1 -p disease=NCIT:C34373 -p age=40 --dry-run
///   fanquery --analytics age-dist -p disease=NCIT:C34373 -p age1=18 -p age2=40 -p age3=65
///   fanquery --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// List the query template catalog
    #[arg(long, conflicts_with_all = ["template", "analytics"])]
    pub list: bool,

    /// Template id to run (see --list), or its full content hash
    ///
    /// Kept as text so that malformed ids are reported the same way as
    /// unknown ones.
    #[arg(short, long, value_name = "ID")]
    pub template: Option<String>,

    /// Run the template carrying this analytics key and reduce its rows
    #[arg(short, long, value_name = "KEY", conflicts_with = "template")]
    pub analytics: Option<AnalyticsKey>,

    /// Print the template text and its parameters without running it
    #[arg(long, requires = "template")]
    pub describe: bool,

    /// Template parameter as name=value (repeatable)
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Bind the template and print the query without sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Add an endpoint as NAME=URL (repeatable, after configured endpoints)
    #[arg(short, long = "endpoint", value_name = "NAME=URL")]
    pub endpoints: Vec<String>,

    /// Output file path (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fanquery.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "FANQUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Per-endpoint request timeout in seconds
    #[arg(long, value_name = "SECS", env = "FANQUERY_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Maximum number of endpoints queried at once
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Exit with code 2 when any endpoint failed to answer
    #[arg(long)]
    pub fail_on_partial: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .fanquery.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Split `name=value` at the first `=`. The name is trimmed and must not be empty.
pub fn parse_pair(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if !self.list && self.template.is_none() && self.analytics.is_none() {
            return Err("Nothing to do: pass --list, --template or --analytics".to_string());
        }

        if let Some(bad) = self.params.iter().find(|p| parse_pair(p).is_none()) {
            return Err(format!("Parameter must be NAME=VALUE: {}", bad));
        }

        for raw in &self.endpoints {
            match parse_pair(raw) {
                Some((_, url)) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(_) => {
                    return Err(format!(
                        "Endpoint URL must start with 'http://' or 'https://': {}",
                        raw
                    ))
                }
                None => return Err(format!("Endpoint must be NAME=URL: {}", raw)),
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Template parameters keyed by name. A repeated name keeps its last value.
    pub fn parsed_params(&self) -> BTreeMap<String, String> {
        self.params.iter().filter_map(|p| parse_pair(p)).collect()
    }

    /// Ad-hoc endpoints in the order given.
    pub fn parsed_endpoints(&self) -> Vec<(String, String)> {
        self.endpoints.iter().filter_map(|e| parse_pair(e)).collect()
    }
}
