//! CERTA Painel - outreach dashboard for the CERTA program
//!
//! Serves a public dashboard over two CSV files, downloads of those
//! files, and a password-gated admin panel that edits them.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad config, bind failure, unreadable data, etc.)

mod admin;
mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod store;
mod web;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use std::path::Path;
use store::TabularStore;
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

    // Initialize logging
    init_logging(&args);

    info!("CERTA Painel v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Startup failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .certa.toml.
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
    println!("   Edit it to set the port, data directory and admin credentials.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Resolve configuration, prepare the data directory, then either write
/// the offline summary or serve until shutdown.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    debug!("Configuration: {:?}", config);

    let store = TabularStore::new(
        config.storage.data_dir.clone(),
        config.storage.seed_dir.clone(),
    );
    store.prepare().with_context(|| {
        format!(
            "Failed to prepare data directory {}",
            config.storage.data_dir.display()
        )
    })?;

    if let Some(ref output) = args.report {
        return write_summary(&store, output, args.format);
    }

    if config.auth.uses_defaults() {
        warn!("Default admin password or session secret in use; set ADMIN_PASS and SECRET_KEY");
    }

    serve(config, store).await
}

/// Load both data files, aggregate and write the summary report.
fn write_summary(store: &TabularStore, output: &Path, format: OutputFormat) -> Result<()> {
    println!("📂 Reading data from {}", store.data_dir().display());

    let snapshot = store.load_institutions()?;
    let records = store.load_demographics()?;
    let summary = report::Report::build(
        &snapshot,
        &records,
        &store.data_dir().display().to_string(),
    );

    let content = match format {
        OutputFormat::Json => report::generate_json_report(&summary)?,
        OutputFormat::Markdown => report::generate_markdown_report(&summary),
    };
    report::write_report(&content, output)?;

    let totals = &summary.dashboard.summary.totals;
    println!("\n📊 Summary:");
    println!("   Municipalities: {}", summary.metadata.municipalities);
    println!("   Institutions: {}", summary.metadata.institutions);
    println!(
        "   Workshops: {} | Assistive tech: {} | Pedagogical: {} | Open day: {}",
        totals.workshops, totals.assistive_tech, totals.pedagogical, totals.open_day
    );
    println!("   People served: {}", summary.dashboard.demographics.total);
    println!("\n✅ Report saved to: {}", output.display());

    Ok(())
}

/// Bind the listener and run the HTTP server.
async fn serve(config: Config, store: TabularStore) -> Result<()> {
    let address = config.bind_address();
    let app = web::router(web::AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Listening on http://{}", address);
    println!("🚀 CERTA Painel running at http://{}", address);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
