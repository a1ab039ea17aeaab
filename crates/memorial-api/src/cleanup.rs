use std::time::Duration;
use tracing::{info, warn};

use crate::state::AppState;

/// Background task that prunes expired sessions and idle rate-limiter keys.
pub async fn run_cleanup_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match cleanup_once(&state).await {
            Ok((sessions, keys)) => {
                if sessions > 0 || keys > 0 {
                    info!(
                        "Cleanup: pruned {} expired sessions, {} idle rate-limit keys",
                        sessions, keys
                    );
                }
            }
            Err(e) => {
                warn!("Cleanup error: {}", e);
            }
        }
    }
}

/// One sweep. Returns `(expired sessions removed, limiter keys removed)`.
pub async fn cleanup_once(state: &AppState) -> anyhow::Result<(usize, usize)> {
    let sessions = state.sessions.clone();
    let pruned = tokio::task::spawn_blocking(move || sessions.prune_expired()).await??;

    let keys = state.memory_limiter.sweep() + state.login_limiter.sweep();
    Ok((pruned, keys))
}
