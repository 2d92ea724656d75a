//! Waiting for the host bridge to come up
//!
//! The host injects its API object some time after the front-end starts.
//! Callers poll a readiness probe until it reports ready or the timeout
//! runs out.

use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::Error;

/// Poll `probe` every `interval` until it returns true or `timeout` elapses
pub fn wait_for_bridge<F>(mut probe: F, timeout: Duration, interval: Duration) -> Result<(), Error>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if probe() {
            log::debug!("host bridge ready after {:?}", start.elapsed());
            return Ok(());
        }
        if start.elapsed() >= timeout {
            log::warn!("host bridge not ready after {:?}", timeout);
            return Err(Error::Bridge(format!(
                "host API unavailable after {} ms",
                timeout.as_millis()
            )));
        }
        std::thread::sleep(interval);
    }
}

/// [`wait_for_bridge`] with timeout and interval taken from `config`
pub fn wait_for_bridge_with<F>(probe: F, config: &EngineConfig) -> Result<(), Error>
where
    F: FnMut() -> bool,
{
    wait_for_bridge(probe, config.bridge_timeout(), config.bridge_poll_interval())
}

/// Async variant for hosts running a tokio runtime
#[cfg(feature = "async")]
pub async fn wait_for_bridge_async<F>(
    mut probe: F,
    timeout: Duration,
    interval: Duration,
) -> Result<(), Error>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if probe() {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(Error::Bridge(format!(
                "host API unavailable after {} ms",
                timeout.as_millis()
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_after_a_few_polls() {
        let mut polls = 0;
        let result = wait_for_bridge(
            || {
                polls += 1;
                polls >= 3
            },
            Duration::from_millis(500),
            Duration::from_millis(1),
        );
        assert!(result.is_ok());
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_times_out() {
        let result = wait_for_bridge(|| false, Duration::from_millis(20), Duration::from_millis(5));
        assert!(matches!(result, Err(Error::Bridge(_))));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_ready_immediately() {
        let result =
            wait_for_bridge_async(|| true, Duration::from_millis(10), Duration::from_millis(1)).await;
        assert!(result.is_ok());
    }
}
