use std::time::Duration;

use crate::error::Error;

pub const MAX_RETRIES: u32 = 3;
const BACKOFF_SECONDS: &[u64] = &[2, 5, 10];

/// Check if an API error is a 429 rate limit.
pub fn is_rate_limited(e: &Error) -> bool {
    e.status() == Some(429)
}

/// Retry an API call expression with backoff on 429 errors.
///
/// Usage: `retry_api!(self.send(self.http.get(&url)))`
///
/// The expression is re-evaluated on each attempt, so request builders
/// inside it are rebuilt. A macro because the expression borrows `self`
/// and async closures returning borrowed futures can't satisfy `Fn`.
macro_rules! retry_api {
    ($expr:expr) => {{
        let mut _attempt: u32 = 0;
        loop {
            match $expr.await {
                Ok(val) => break Ok(val),
                Err(e) => {
                    if $crate::api::rate_limit::is_rate_limited(&e)
                        && _attempt < $crate::api::rate_limit::MAX_RETRIES
                    {
                        $crate::api::rate_limit::backoff_sleep(_attempt).await;
                        _attempt += 1;
                    } else {
                        break Err(e);
                    }
                }
            }
        }
    }};
}

pub(crate) use retry_api;

/// Sleep for the backoff duration of the given attempt.
pub async fn backoff_sleep(attempt: u32) {
    let wait = backoff_for(attempt);
    log::warn!(
        "Rate limited (429). Waiting {}s before retry {}/{}",
        wait.as_secs(),
        attempt + 1,
        MAX_RETRIES
    );
    tokio::time::sleep(wait).await;
}

fn backoff_for(attempt: u32) -> Duration {
    let secs = BACKOFF_SECONDS
        .get(attempt as usize)
        .copied()
        .unwrap_or(10);
    Duration::from_secs(secs)
}
