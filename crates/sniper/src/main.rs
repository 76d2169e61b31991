use std::sync::Arc;

use sniper_core::{config::Config, pruner::Pruner, tracker::SnipeTracker};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), sniper_core::Error> {
    sniper_core::logging::init("sniper")?;

    let cfg = Arc::new(Config::load()?);
    info!(
        prefix = %cfg.command_prefix,
        max_age_secs = cfg.settings.max_age.as_secs(),
        mode = %cfg.settings.response_mode,
        "sniper starting"
    );

    let tracker = Arc::new(SnipeTracker::new(cfg.settings));
    let pruner = Pruner::spawn(tracker.clone(), cfg.prune_interval);

    let result = sniper_discord::run_gateway(cfg, tracker).await;
    pruner.stop();

    result.map_err(|e| sniper_core::Error::Discord(format!("discord bot failed: {e}")))?;
    Ok(())
}
