use super::CancelToken;
use std::time::Duration;

/// Suspends the calling thread for `delay` or until `token` fires.
///
/// Returns `true` if the token fired before the delay elapsed. The wait is a
/// timed condition-variable wait, so nothing outlives the call on either
/// path.
///
/// ```
/// use std::time::Duration;
/// use waitall::cancel::{sleep, CancelToken};
///
/// let token = CancelToken::with_timeout(Duration::from_millis(10));
/// assert!(sleep(&token, Duration::from_secs(5)));
/// ```
pub fn sleep(token: &CancelToken, delay: Duration) -> bool {
    let fired = token.wait_timeout(delay);
    tracing::trace!(delay_ms = delay.as_millis() as u64, fired, "sleep finished");
    fired
}
