mod api;
mod cards;
mod config;
mod fleet;
mod guard;
mod health;
mod poller;
mod ticker;
mod timeline;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::BackendClient;
use crate::config::Config;
use crate::guard::InspectGuard;
use crate::timeline::TimelineView;

#[derive(Parser)]
#[command(name = "minerdash", about = "Terminal dashboard for the miner robot fleet")]
struct Cli {
    /// Fetch every dataset once, print a plain snapshot to stdout, then exit
    #[arg(long, alias = "headless")]
    once: bool,

    /// Override the card grid refresh interval (seconds)
    #[arg(long)]
    interval: Option<u64>,

    /// Load config from a specific .env file
    #[arg(long)]
    config_file: Option<String>,

    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::from_env_file(cli.config_file.as_deref())?;
    if let Some(url) = cli.base_url {
        cfg.api_base = url;
    }
    let cards_interval = cli.interval.unwrap_or(cfg.cards_interval_secs);

    if cli.once {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| cfg.log_filter.clone().into()),
            )
            .with_writer(std::io::stderr)
            .init();
        let client = BackendClient::new(&cfg.api_base, cfg.http_timeout_secs);
        return headless_snapshot(&client).await;
    }

    // The terminal owns stdout, so logs go to a file. The diag target starts
    // silenced because the inspect guard starts enabled.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.log_path)
        .with_context(|| format!("open log file {}", cfg.log_path))?;
    let (filter_layer, reload_handle) =
        tracing_subscriber::reload::Layer::new(guard::diag_filter(true, &cfg.log_filter));
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(log_file))
                .with_ansi(false),
        )
        .init();

    info!("══════════════════════════════════════════════════════");
    info!("  MINER FLEET DASHBOARD v1.0");
    info!("  Backend: {}", cfg.api_base);
    info!(
        "  Cards: every {}s | Ticker window: every {}s | Frame: {}ms",
        cards_interval, cfg.ticker_window_secs, cfg.frame_ms
    );
    info!(
        "  Timeline: max {} robots | interpolation {:?} (tension {})",
        timeline::MAX_SELECTED,
        timeline::INTERPOLATION,
        timeline::INTERPOLATION.tension()
    );
    info!("  Stop: Ctrl+C or q");
    info!("══════════════════════════════════════════════════════");

    let client = Arc::new(BackendClient::new(&cfg.api_base, cfg.http_timeout_secs));

    // Graceful shutdown: Ctrl+C flips the watch channel every task selects on.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    {
        let stop_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("STOP SIGNAL (Ctrl+C)");
            stop_tx.send(true).ok();
        });
    }

    let (coleta_tx, coleta_rx) = watch::channel("--".to_string());
    let (cards_tx, cards_rx) = watch::channel(cards::initial_grid());
    let (view_tx, view_rx) = watch::channel(None::<TimelineView>);
    let (robots_tx, robots_rx) = watch::channel(Vec::<String>::new());
    let (ticker_tx, ticker_rx) = watch::channel(Vec::<ticker::TickerItem>::new());
    let (select_tx, mut select_rx) = mpsc::channel::<Vec<String>>(4);

    // Status poller: a single fetch at startup, no retry.
    {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            match client.ultima_coleta().await {
                Ok(value) => {
                    coleta_tx.send(value.unwrap_or_else(|| "N/A".to_string())).ok();
                }
                Err(e) => error!("latest collection fetch failed: {e:#}"),
            }
        });
    }

    // Card grid poller: immediate first tick, then periodic.
    {
        let client = Arc::clone(&client);
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            poller::run_periodic(
                "cards",
                Duration::from_secs(cards_interval),
                shutdown_rx,
                move || {
                    let client = Arc::clone(&client);
                    let tx = cards_tx.clone();
                    async move {
                        let grid = cards::refresh(&client).await?;
                        tx.send(grid).ok();
                        Ok(())
                    }
                },
            )
            .await;
        });
    }

    // Ticker data: loaded once; only the visual window reshuffles afterwards.
    {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            match client.scroller().await {
                Ok(raw) => {
                    let items = ticker::build_items(&raw);
                    info!("ticker: {} items loaded", items.len());
                    ticker_tx.send(items).ok();
                }
                Err(e) => error!("scroller fetch failed: {e:#}"),
            }
        });
    }

    // Timeline worker: fetches on demand for each applied selection. On any
    // failure the previous chart state is left untouched.
    {
        let client = Arc::clone(&client);
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe = select_rx.recv() => {
                        let Some(selection) = maybe else { break };
                        match client.timeline().await {
                            Ok(data) => {
                                let mut names: Vec<String> = data.keys().cloned().collect();
                                names.sort();
                                robots_tx.send(names).ok();
                                match timeline::build_view(&data, &selection) {
                                    Ok(view) => { view_tx.send(Some(view)).ok(); }
                                    // The UI rejects oversized selections before
                                    // sending; this is a backstop.
                                    Err(e) => error!("timeline selection rejected: {e}"),
                                }
                            }
                            Err(e) => error!("timeline fetch failed: {e:#}"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
    }

    // Initial chart: the default robots, filtered by payload presence when
    // the view is built.
    let default_selection: Vec<String> = fleet::DEFAULT_TIMELINE_ROBOTS
        .iter()
        .map(|s| s.to_string())
        .collect();
    select_tx.send(default_selection.clone()).await.ok();

    let feeds = ui::Feeds {
        last_collection: coleta_rx,
        cards: cards_rx,
        timeline: view_rx,
        robots: robots_rx,
        ticker: ticker_rx,
        select_tx,
    };
    let guard = InspectGuard::new(&cfg.log_filter, Some(reload_handle));
    let app = ui::App::new(
        feeds,
        guard,
        default_selection,
        Duration::from_secs(cfg.ticker_window_secs),
        cfg.ticker_scroll_speed,
    );

    let result = app.run(shutdown_rx, Duration::from_millis(cfg.frame_ms)).await;

    shutdown_tx.send(true).ok();
    info!("shutdown complete");
    result
}

/// One-shot snapshot for manual verification and smoke checks: fetch every
/// dataset once and print a plain-text rendition to stdout.
async fn headless_snapshot(client: &BackendClient) -> Result<()> {
    let coleta = client.ultima_coleta().await?;
    println!("Last collection: {}", coleta.as_deref().unwrap_or("N/A"));

    let grid = cards::refresh(client).await?;
    println!();
    println!("{:<24} {:>8}  {:<8} {}", "ROBOT", "WORKING", "HEALTH", "MINED");
    for card in &grid {
        println!(
            "{:<24} {:>8}  {:<8} {}",
            card.robot,
            card.working,
            format!("{:?}", card.health),
            card.mined
        );
    }

    let data = client.timeline().await?;
    let selection: Vec<String> = fleet::DEFAULT_TIMELINE_ROBOTS
        .iter()
        .map(|s| s.to_string())
        .collect();
    let view = timeline::build_view(&data, &selection)?;
    println!();
    println!(
        "Timeline: {} series over {} labels ({} .. {})",
        view.series.len(),
        view.labels.len(),
        view.labels.first().map(String::as_str).unwrap_or("-"),
        view.labels.last().map(String::as_str).unwrap_or("-"),
    );

    let items = ticker::build_items(&client.scroller().await?);
    println!();
    let rendered: Vec<String> = items
        .iter()
        .map(|i| {
            let arrow = match i.trend() {
                ticker::Trend::Up => "▲ ",
                ticker::Trend::Down => "▼ ",
                ticker::Trend::Flat => "",
            };
            format!("{} {arrow}{}", i.robot, i.display_value())
        })
        .collect();
    println!("Ticker: {}", rendered.join("   "));

    Ok(())
}
