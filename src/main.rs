mod analyst;
mod classifier;
mod db;
mod error;
mod extractor;
mod fetcher;
mod http;
mod pipeline;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::analyst::ChatClient;
use crate::pipeline::Pipeline;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "shopify_store_analyzer", about = "Detect Shopify stores and store an AI assessment of each")]
struct Cli {
    /// Configuration file (toml, yaml or json). Env vars SHOPIFY_ANALYZER_* override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify, scrape, analyze and persist each URL
    Run {
        /// URLs to analyze (default: target_urls from configuration)
        urls: Vec<String>,
    },
    /// Create the stores and store_data tables
    Init,
    /// Show row counts
    Stats,
    /// Most recently analyzed stores
    Overview {
        /// Only stores classified as Shopify
        #[arg(long)]
        shopify_only: bool,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(settings_loaded = ?settings, "Starting store analyzer");
    let unused = settings.unused_db_options();
    if !unused.is_empty() {
        warn!(options = ?unused, "SQLite store ignores server connection options");
    }

    let result = execute(cli.command, &settings);

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// The database is only opened by commands that need it.
fn execute(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    let db_path = settings.db_path();

    match command {
        Commands::Run { urls } => {
            let urls = if urls.is_empty() { settings.target_urls.clone() } else { urls };
            if urls.is_empty() {
                println!("No URLs given. Pass them as arguments or set target_urls.");
                return Ok(());
            }

            let http = http::build_client(settings).context("Failed to build HTTP client")?;
            let analyst = ChatClient::new(http.clone(), settings)?;
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let pipeline = Pipeline::new(&http, &conn, &analyst, settings.max_body_bytes);

            println!("Analyzing {} URL(s)...", urls.len());
            let stats = pipeline.run(&urls);
            println!(
                "Done: {} URLs ({} stored, {} not Shopify, {} failed).",
                stats.total, stats.persisted, stats.not_shopify, stats.failed
            );
            for f in &stats.failures {
                println!("  {} failed while {}: {}", f.url, f.step, f.message);
            }
            Ok(())
        }
        Commands::Init => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            println!("Schema ready in {:?}", db_path);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Stores:        {}", s.stores);
            println!("Shopify:       {}", s.shopify);
            println!("Scraped data:  {}", s.scraped);
            println!("Distinct URLs: {}", s.distinct_urls);
            Ok(())
        }
        Commands::Overview { shopify_only, limit } => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, shopify_only, limit)?;
            if rows.is_empty() {
                println!("No stores found.");
                return Ok(());
            }

            println!(
                "{:>5} | {:<32} | {:<7} | {:<19} | {:<40}",
                "ID", "URL", "Shopify", "Analyzed at", "Analysis"
            );
            println!("{}", "-".repeat(115));
            for r in &rows {
                println!(
                    "{:>5} | {:<32} | {:<7} | {:<19} | {:<40}",
                    r.id,
                    truncate(&r.url, 32),
                    if r.is_shopify { "yes" } else { "no" },
                    r.created_at,
                    truncate(&one_line(&r.analysis), 40),
                );
                if let Some(data) = &r.data {
                    println!("{:>5} | {}", "", truncate(&one_line(data), 105));
                }
            }
            println!("\n{} stores", rows.len());
            Ok(())
        }
    }
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
