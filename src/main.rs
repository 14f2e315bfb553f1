//! fanquery - federated SPARQL template broker
//!
//! Binds a catalogued query template, sends it to every registered
//! SPARQL endpoint concurrently, and merges the answers.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime or validation error (unknown template, missing parameters, config)
//!   2 - At least one endpoint failed and --fail-on-partial was given

mod analytics;
mod binder;
mod broker;
mod catalog;
mod cli;
mod config;
mod dispatch;
mod error;
mod models;
mod report;
mod results;

use anyhow::{Context, Result};
use broker::Broker;
use catalog::Catalog;
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use dispatch::{DispatchConfig, Dispatcher};
use error::BrokerError;
use models::{AnalyticsKey, RunMetadata};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first so `[general] verbose` can raise the log level
    let (mut config, config_path) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("fanquery v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_path {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    match run(&args, &config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            if let Some(broker_err) = e.downcast_ref::<BrokerError>() {
                if broker_err.is_unknown_template() {
                    debug!("{}", broker_err);
                    eprintln!("Unknown query template.");
                    std::process::exit(1);
                }
            }
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fanquery.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to register endpoints and tune timeouts.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the requested action. Returns the exit code (0 or 2).
async fn run(args: &Args, config: &Config) -> Result<i32> {
    let dispatcher = Dispatcher::new(DispatchConfig::from(&config.dispatch))
        .context("Failed to build HTTP client")?;
    let endpoints = config.registry();
    debug!("Endpoint registry: {:?}", endpoints);

    let broker = Broker::new(Catalog::load(), endpoints, dispatcher);
    let params = args.parsed_params();

    if args.list {
        let output = match args.format {
            OutputFormat::Json => report::generate_json(&broker.list_templates())?,
            OutputFormat::Markdown => report::generate_catalog_markdown(broker.list_templates()),
        };
        emit(config, &output)?;
        return Ok(0);
    }

    let raw_id = args.template.as_deref().unwrap_or_default();

    if args.describe {
        let template = broker.template(raw_id)?;
        let fields = broker.fields(raw_id)?;
        let output = match args.format {
            OutputFormat::Json => report::generate_json(&report::TemplateDescription {
                template,
                fields: &fields,
            })?,
            OutputFormat::Markdown => report::generate_template_markdown(template, &fields),
        };
        emit(config, &output)?;
        return Ok(0);
    }

    if args.dry_run {
        let bound = match args.analytics {
            Some(key) => broker.bind_analytics(key, &params)?,
            None => broker.bind(raw_id, &params)?,
        };
        let output = match args.format {
            OutputFormat::Json => report::generate_json(&bound)?,
            OutputFormat::Markdown => report::generate_bound_query_markdown(&bound),
        };
        emit(config, &output)?;
        status_line(args, "✅ Dry run complete. No endpoints were contacted.");
        return Ok(0);
    }

    if let Some(key) = args.analytics {
        return run_analytics(args, config, &broker, key, &params).await;
    }

    run_query(args, config, &broker, raw_id, &params).await
}

/// Bind, fan out, merge, and render one template.
async fn run_query(
    args: &Args,
    config: &Config,
    broker: &Broker,
    raw_id: &str,
    params: &std::collections::BTreeMap<String, String>,
) -> Result<i32> {
    let start_time = Instant::now();
    let template = broker.template(raw_id)?;

    let (bound, merged) = broker.run(raw_id, params).await?;

    let metadata = RunMetadata {
        template_id: template.id,
        description: template.description.clone(),
        generated_at: Utc::now(),
        endpoints_contacted: broker.endpoints().len(),
        endpoints_failed: merged.failed.len(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json(&report::QueryReport {
            metadata: &metadata,
            query: &bound,
            result: &merged,
        })?,
        OutputFormat::Markdown => report::generate_results_markdown(&metadata, &merged),
    };
    emit(config, &output)?;

    status_line(
        args,
        &format!(
            "📊 {} of {} endpoints answered, {} rows in {:.1}s",
            merged.responses.len(),
            metadata.endpoints_contacted,
            merged.rows.len(),
            metadata.duration_seconds
        ),
    );

    if !merged.is_partial() {
        return Ok(0);
    }
    Ok(partial_exit_code(args, &merged.failed))
}

/// Run an analytics reduction and render it.
async fn run_analytics(
    args: &Args,
    config: &Config,
    broker: &Broker,
    key: AnalyticsKey,
    params: &std::collections::BTreeMap<String, String>,
) -> Result<i32> {
    let start_time = Instant::now();

    let result = broker.run_analytics(key, params).await?;
    let description = broker
        .list_templates()
        .get(result.template_id)
        .map(|t| t.description.clone())
        .unwrap_or_default();

    let metadata = RunMetadata {
        template_id: result.template_id,
        description,
        generated_at: Utc::now(),
        endpoints_contacted: broker.endpoints().len(),
        endpoints_failed: result.failed.len(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json(&report::AnalyticsReport {
            metadata: &metadata,
            analytics: &result,
        })?,
        OutputFormat::Markdown => report::generate_analytics_markdown(&metadata, &result),
    };
    emit(config, &output)?;

    Ok(partial_exit_code(args, &result.failed))
}

/// Exit code 2 when endpoints failed and the caller asked to be told.
fn partial_exit_code(args: &Args, failed: &[String]) -> i32 {
    if failed.is_empty() {
        return 0;
    }

    warn!("{} endpoint(s) failed: {}", failed.len(), failed.join(", "));
    if args.fail_on_partial {
        eprintln!("\n⛔ Results are partial. Failing (exit code 2).");
        return 2;
    }
    0
}

/// Write rendered output to the configured file, or stdout.
fn emit(config: &Config, output: &str) -> Result<()> {
    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path))?;
            info!("Output saved to: {}", path);
        }
        None => println!("{}", output),
    }
    Ok(())
}

/// Print a progress note on stderr unless quiet.
fn status_line(args: &Args, message: &str) {
    if !args.quiet {
        eprintln!("{}", message);
    }
}

/// Load configuration from `--config` or the default location.
///
/// Runs before logging is installed, so it reports where the file came from
/// instead of logging it.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(DEFAULT_CONFIG_FILE)))),
        None => Ok((Config::default(), None)),
    }
}
