//! Seat-map crawler CLI
//!
//! Crawls selected carriers (or all of them) and appends records to
//! `<output_dir>/results.jsonl`. Prints a JSON summary on stdout.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use seatmap_crawler::{
    validate_aircraft_model, validate_iata_code, CrawlerConfig, HttpFetcher, JsonlSink,
    Orchestrator, Registry, Throttle,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "seatmap-crawl")]
#[command(about = "Crawl airline seat-map images from the catalog site")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["airline", "all_airlines", "list_airlines"])
))]
struct Cli {
    /// Carrier IATA codes, comma separated (e.g. CA,MU)
    #[arg(long, value_delimiter = ',')]
    airline: Vec<String>,

    /// Crawl every supported carrier
    #[arg(long)]
    all_airlines: bool,

    /// Print the supported carriers and exit
    #[arg(long)]
    list_airlines: bool,

    /// Only crawl this aircraft model (e.g. A320, "777-300ER")
    #[arg(long)]
    model: Option<String>,

    /// Override the output directory
    #[arg(long)]
    output_dir: Option<String>,

    /// Print session statistics after the crawl
    #[arg(long)]
    stats: bool,

    /// Debug logging for the crawler
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct CarrierListing<'a> {
    iata_code: &'a str,
    display_name_primary: &'a str,
    display_name_secondary: &'a str,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,seatmap_crawler=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("AEROLOPA_LOG_LEVEL"))
        .unwrap_or_else(|_| default.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = Arc::new(Registry::builtin());

    if cli.list_airlines {
        let listing: Vec<_> = registry
            .all()
            .into_iter()
            .map(|c| CarrierListing {
                iata_code: &c.iata_code,
                display_name_primary: &c.display_name_primary,
                display_name_secondary: &c.display_name_secondary,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    let model = cli
        .model
        .as_deref()
        .map(validate_aircraft_model)
        .transpose()
        .context("Invalid --model")?;

    let codes = if cli.all_airlines {
        registry.supported_codes().into_iter().collect::<Vec<_>>()
    } else {
        let mut codes = Vec::new();
        for raw in &cli.airline {
            let code = validate_iata_code(raw).with_context(|| format!("Invalid --airline {raw:?}"))?;
            if !registry.is_supported(&code) {
                bail!("Unsupported airline {code}; see --list-airlines");
            }
            codes.push(code);
        }
        codes
    };

    let mut config = CrawlerConfig::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.output_dir {
        config = config.with_output_dir(dir);
    }

    tracing::info!(
        carriers = codes.len(),
        model = ?model,
        output_dir = %config.output_dir,
        "Starting seat-map crawl"
    );

    let throttle = Arc::new(Throttle::new(config.delay));
    let fetcher = HttpFetcher::new(&config, throttle).context("Failed to build HTTP client")?;
    let sink = JsonlSink::new(&config.output_dir);
    let mut orchestrator = Orchestrator::new(config, registry, fetcher, sink);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            on_interrupt.cancel();
        }
    });

    let summary = orchestrator
        .crawl_many(&codes, model.as_deref(), &cancel)
        .await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&orchestrator.statistics())?);
    }

    Ok(())
}
