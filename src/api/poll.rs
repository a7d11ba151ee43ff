use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use super::models::VideoRecord;

/// Re-check interval used by the web client while analysis runs.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Poll `fetch` until the video reaches `completed` or `failed`.
///
/// Transient fetch errors are logged and retried; only `max_wait` ends the
/// loop early. `on_poll` sees every record fetched, settled or not.
pub fn wait_until_settled<F, P>(
    mut fetch: F,
    interval: Duration,
    max_wait: Option<Duration>,
    mut on_poll: P,
) -> Result<VideoRecord>
where
    F: FnMut() -> Result<VideoRecord>,
    P: FnMut(&VideoRecord),
{
    let started = Instant::now();
    loop {
        match fetch() {
            Ok(record) => {
                on_poll(&record);
                if record.status.is_settled() {
                    return Ok(record);
                }
            }
            Err(err) => log::warn!("status poll failed: {:#}", err),
        }
        if let Some(limit) = max_wait {
            if started.elapsed() + interval > limit {
                return Err(anyhow!(
                    "analysis did not finish within {}s",
                    limit.as_secs()
                ));
            }
        }
        std::thread::sleep(interval);
    }
}
