use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use pps_dashboard::config::{DashboardConfig, SourceKind};
use pps_dashboard::ingest::{self, FallbackSource, JkmSource, RecordSource, SampleSource};
use pps_dashboard::logging::{self, Component};
use pps_dashboard::model::{StateOrder, Statistics};
use pps_dashboard::{proxy, render, verify};

#[derive(Parser)]
#[command(name = "pps-dashboard", version, about = "Flood relief centre (PPS) dashboard")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "PPS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured data source (direct, relay, sample)
    #[arg(long, global = true)]
    source: Option<SourceKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch records and print per-state totals
    Report {
        /// first-seen, shelters, victims or state
        #[arg(long, default_value = "first-seen")]
        sort: StateOrder,
        /// Print the statistics as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Fetch records and write the HTML dashboard
    Render {
        #[arg(long, short = 'o', default_value = "dashboard.html")]
        out: PathBuf,
        #[arg(long, default_value = "shelters")]
        sort: StateOrder,
    },
    /// Run the relay and dashboard server
    Serve {
        /// Address to bind, e.g. 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Check that the configured endpoints answer with usable records
    Verify {
        /// Also probe the relay URL
        #[arg(long)]
        relay: bool,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            logging::error(Component::System, None, &e.to_string());
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(kind) = cli.source {
        config.source.kind = kind;
    }

    logging::init_logger(
        config.logging.min_level()?,
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    )?;

    match cli.command {
        Command::Report { sort, json } => {
            let source = ingest::from_config(&config.source)?;
            let loaded = ingest::load_statistics(source.as_ref(), &config.fields)?;
            let stats = loaded.statistics.sorted_by(sort);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_report(&stats, loaded.origin);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Render { out, sort } => {
            let source = ingest::from_config(&config.source)?;
            let loaded = ingest::load_statistics(source.as_ref(), &config.fields)?;
            let stats = loaded.statistics.sorted_by(sort);
            let view = render::build_view(&stats, loaded.origin, chrono::Utc::now());
            std::fs::write(&out, render::render_html(&view))?;
            logging::info(
                Component::System,
                None,
                &format!("Dashboard written to {}", out.display()),
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.proxy.bind = bind;
            }
            serve(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { relay, json } => {
            let report = verify::run_verification(&config, relay)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                verify::print_summary(&report);
            }
            Ok(if report.failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// The relay always talks to the JKM API itself; pointing it at a relay
/// would make it request itself.
fn serve(config: &DashboardConfig) -> Result<(), Box<dyn Error>> {
    let addr = config.proxy.bind_addr()?;

    // Blocking clients are built before the async runtime starts.
    let upstream: Arc<dyn RecordSource> = match config.source.kind {
        SourceKind::Sample => Arc::new(SampleSource::new()),
        SourceKind::Direct | SourceKind::Relay => {
            if config.source.kind == SourceKind::Relay {
                logging::warn(
                    Component::Proxy,
                    None,
                    "source kind 'relay' ignored by serve; requesting the JKM API directly",
                );
            }
            let direct = JkmSource::new(&config.source)?;
            Arc::new(FallbackSource::new(Box::new(direct), config.source.on_failure))
        }
    };

    let state = proxy::AppState::new(
        upstream,
        config.fields.clone(),
        config.proxy.static_dir.clone(),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        proxy::run(listener, state).await
    })?;
    Ok(())
}

fn print_report(stats: &Statistics, origin: Component) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 PPS SUMMARY (source: {})", origin);
    println!("═══════════════════════════════════════════════════════════");
    println!("Total PPS:     {}", stats.total_shelter_count);
    println!("Total Victims: {}", stats.total_victim_count);
    if !stats.is_valid_input() {
        println!("⚠ Source response was not a record list; totals are zero.");
    }
    println!();
    println!("{:<24} {:>10} {:>14}", "State", "PPS Count", "Total Victims");
    println!("{}", "-".repeat(50));
    for s in &stats.by_state {
        println!("{:<24} {:>10} {:>14}", s.state, s.shelter_count, s.victim_total);
    }
    println!("═══════════════════════════════════════════════════════════");
}
