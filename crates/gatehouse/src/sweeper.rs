//! Periodic cleanup tasks.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::AppState;

/// Background sweep worker: captcha expiry, revocation registry expiry,
/// ledger retention.
///
/// Every sweep only deletes rows that are already logically dead, so running
/// beside live traffic is safe and re-running after a missed tick changes
/// nothing.
pub async fn sweep_worker(state: AppState, mut shutdown: broadcast::Receiver<()>) {
    let mut captcha_tick = interval(Duration::from_secs(state.config.captcha.sweep_interval_secs));
    let mut revocation_tick = interval(Duration::from_secs(state.config.token.sweep_interval_secs));
    let mut ledger_tick = interval(Duration::from_secs(
        state.config.defense.ledger_sweep_interval_secs,
    ));

    // Intervals fire immediately on creation; swallow the initial ticks so
    // the first real sweep happens one period in
    captcha_tick.tick().await;
    revocation_tick.tick().await;
    ledger_tick.tick().await;

    loop {
        tokio::select! {
            _ = captcha_tick.tick() => {
                let mut redis = state.redis.clone();
                match state.captcha_verifier.sweep_expired(&mut redis).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Swept expired captcha challenges");
                    }
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "Captcha sweep failed"),
                }
            }
            _ = revocation_tick.tick() => {
                let mut redis = state.redis.clone();
                match state.revocations.sweep_expired(&mut redis).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Swept expired revocation rows");
                    }
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "Revocation sweep failed"),
                }
            }
            _ = ledger_tick.tick() => {
                let mut redis = state.redis.clone();
                match state.ledger.sweep_retention(&mut redis).await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Trimmed attempt ledger");
                    }
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "Ledger retention sweep failed"),
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Sweep worker shutting down");
                break;
            }
        }
    }
}
