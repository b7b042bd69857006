use std::time::Duration;

use tracing::{info, warn};

use scholarify_api::auth::AppState;
use scholarify_api::today;

/// Rate-limit buckets idle this long have fully refilled and can go.
const BUCKET_IDLE: Duration = Duration::from_secs(10 * 60);

/// Background task that keeps derived state tidy.
///
/// Runs on an interval: expires listings whose deadline passed without a
/// re-save, forgets revoked tokens that have expired on their own and drops
/// idle rate-limit buckets.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match sweep_once(&state).await {
            Ok((expired, pruned)) => {
                if expired > 0 || pruned > 0 {
                    info!(
                        "Sweep: expired {} listings, pruned {} revoked tokens",
                        expired, pruned
                    );
                }
            }
            Err(e) => {
                warn!("Sweep error: {:#}", e);
            }
        }

        let dropped = state.signup_limiter.prune_idle(BUCKET_IDLE).await
            + state.contact_limiter.prune_idle(BUCKET_IDLE).await;
        if dropped > 0 {
            info!("Sweep: dropped {} idle rate-limit buckets", dropped);
        }
    }
}

async fn sweep_once(state: &AppState) -> anyhow::Result<(usize, usize)> {
    let state = state.clone();
    let date = today();
    let now_ts = chrono::Utc::now().timestamp();

    tokio::task::spawn_blocking(move || {
        let expired = state.db.expire_overdue_listings(date)?;
        let pruned = state.db.prune_revoked_tokens(now_ts)?;
        Ok::<_, anyhow::Error>((expired, pruned))
    })
    .await?
}
