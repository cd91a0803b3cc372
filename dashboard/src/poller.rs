use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Run `tick` every `period` until the shutdown signal fires.
///
/// Each cycle is awaited in full before the next one is considered and
/// missed ticks are skipped, so a slow fetch can never overlap the next
/// tick's writes. A failing cycle is logged and does not affect later ones.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = tick().await {
                    error!("{name} poll failed: {e:#}");
                }
            }
            _ = shutdown.changed() => {
                info!("{name} poller stopped");
                break;
            }
        }
    }
}
