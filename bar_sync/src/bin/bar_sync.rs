//! `bar-sync`: register instruments, synchronize their history, inspect the result.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bar_sync::{
    config::{SyncConfig, SyncSettings},
    db::{connection::connect_sqlite, migrate},
    orchestrator::SyncOrchestrator,
    progress::{ProgressStore, SqliteProgressStore, Watermark},
    registry::register_category,
    series::{
        inspect::summarize,
        store::{SeriesKey, SeriesStore},
    },
    tz::parse_compact_local,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use market_data_ingestor::{
    io::parquet::read_bars,
    models::{adjustment::Adjustment, instrument::InstrumentCategory, period::Period},
    providers::gateway::{GatewayConfig, GatewayTerminal, params::compact_time},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Incremental bar sync from the market data terminal")]
struct Cli {
    /// Configuration file.
    #[arg(long, short, value_name = "FILE", default_value = "bar_sync.toml")]
    config: PathBuf,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending database migrations.
    Migrate,
    /// Seed exchanges and register the instruments of each category.
    Register {
        /// Only this category (FUTURE or STOCK).
        #[arg(long)]
        category: Option<InstrumentCategory>,
    },
    /// Download and save every registered instrument.
    Run {
        /// Only this category (FUTURE or STOCK).
        #[arg(long)]
        category: Option<InstrumentCategory>,
        /// Range end as YYYYMMDDHHMMSS in the configured timezone; defaults to now.
        #[arg(long, value_name = "TIME")]
        until: Option<String>,
    },
    /// Print stored progress.
    Status {
        /// Only this category (FUTURE or STOCK).
        #[arg(long)]
        category: Option<InstrumentCategory>,
    },
    /// Summarize a series file.
    Inspect {
        /// Series file to read.
        #[arg(conflicts_with = "instrument", required_unless_present = "instrument")]
        file: Option<PathBuf>,
        /// Resolve the file from a registered instrument long id instead.
        #[arg(long, requires = "period")]
        instrument: Option<String>,
        /// Period of the series, with --instrument.
        #[arg(long)]
        period: Option<Period>,
        /// Adjustment of the series, with --instrument.
        #[arg(long, default_value = "none")]
        adjustment: Adjustment,
        /// Trading days to list.
        #[arg(long, default_value_t = 100)]
        days: usize,
    },
}

fn categories(
    settings: &SyncSettings,
    only: Option<InstrumentCategory>,
) -> Vec<InstrumentCategory> {
    settings
        .categories
        .iter()
        .map(|c| c.category)
        .filter(|c| only.is_none_or(|o| o == *c))
        .collect()
}

fn terminal(settings: &SyncSettings) -> Result<GatewayTerminal> {
    let config = GatewayConfig {
        base_url: settings.terminal.base_url.clone(),
        request_timeout: settings.terminal.request_timeout,
        terminal_tz: settings.timezone,
        key_offset: settings.key_offset,
    };
    GatewayTerminal::connect(config).context("cannot build terminal client")
}

fn fmt_watermark(w: Option<Watermark>, settings: &SyncSettings) -> String {
    match w {
        Some(w) => format!(
            "{}..{}",
            compact_time(w.begin, settings.timezone),
            compact_time(w.end, settings.timezone)
        ),
        None => "never".to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "bar_sync={},market_data_ingestor={}",
                    cli.log_level, cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = SyncConfig::load_path(&cli.config)
        .and_then(SyncConfig::resolve)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let store = SqliteProgressStore;

    match cli.cmd {
        Cmd::Migrate => migrate::run_all(&settings.database_url)?,

        Cmd::Register { category } => {
            let mut conn = connect_sqlite(&settings.database_url)?;
            let terminal = terminal(&settings)?;
            for category in categories(&settings, category) {
                let Some(plan) = settings.category(category) else {
                    continue;
                };
                let report =
                    register_category(&terminal, &store, &mut conn, plan, &settings.exchanges)
                        .await
                        .with_context(|| format!("registering {category}"))?;
                for (id, reason) in &report.skipped {
                    println!("skipped {id}: {reason}");
                }
            }
        }

        Cmd::Run { category, until } => {
            let init_end = match until {
                Some(s) => parse_compact_local(&s, settings.timezone)?,
                None => Utc::now(),
            };
            let mut conn = connect_sqlite(&settings.database_url)?;
            let terminal = terminal(&settings)?;
            for category in categories(&settings, category) {
                let Some(plan) = settings.category(category) else {
                    continue;
                };
                let orchestrator = SyncOrchestrator::new(
                    &terminal,
                    &store,
                    SeriesStore::new(&settings.data_dir),
                    plan.clone(),
                    settings.init_begin,
                );
                let report = orchestrator
                    .run(&mut conn, init_end)
                    .await
                    .with_context(|| format!("syncing {category}"))?;
                for failure in report.failures() {
                    println!(
                        "failed {} {} {} {}: {}",
                        failure.instrument_id,
                        failure.phase.as_str(),
                        failure.period,
                        failure.adjustment.map_or("-", Adjustment::as_str),
                        failure.error.as_deref().unwrap_or("unknown error"),
                    );
                }
            }
        }

        Cmd::Status { category } => {
            let mut conn = connect_sqlite(&settings.database_url)?;
            for (id, progress) in store.list(&mut conn, category)? {
                println!(
                    "{id:<16} download {:<31} save {}",
                    fmt_watermark(progress.download, &settings),
                    fmt_watermark(progress.save, &settings),
                );
            }
        }

        Cmd::Inspect {
            file,
            instrument,
            period,
            adjustment,
            days,
        } => {
            let path = match (file, instrument, period) {
                (Some(file), _, _) => file,
                (None, Some(id), Some(period)) => {
                    let mut conn = connect_sqlite(&settings.database_url)?;
                    let instruments = store.instruments(&mut conn, None)?;
                    let Some(instrument) = instruments.iter().find(|i| i.long_id == id) else {
                        bail!("instrument {id} is not registered");
                    };
                    SeriesStore::new(&settings.data_dir).path_for(&SeriesKey {
                        instrument,
                        period,
                        adjustment,
                    })
                }
                _ => bail!("give a file or --instrument with --period"),
            };
            let Some(bars) = read_bars(&path)? else {
                bail!("{} does not exist", path.display());
            };
            println!("{}", path.display());
            println!("{}", summarize(&bars, days));
        }
    }

    Ok(())
}
