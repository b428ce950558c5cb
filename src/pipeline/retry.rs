//! Bounded retry around the marketplace login flow.

use std::time::Duration;
use tracing::{info, warn};

use crate::app::ports::{Credentials, Marketplace};
use crate::config::{Backoff, LoginConfig};
use crate::error::{ListerError, Result};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LoginConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }
}

/// Logs in, retrying failed attempts until the policy runs out.
pub async fn login_with_retry(
    marketplace: &dyn Marketplace,
    credentials: &Credentials,
    policy: &RetryPolicy,
) -> Result<()> {
    let mut attempt = 1;
    loop {
        metrics::login::attempt();
        match marketplace.login(credentials).await {
            Ok(()) => {
                info!(attempt, "Logged in to the marketplace");
                return Ok(());
            }
            Err(e) => {
                metrics::login::failure();
                if attempt >= policy.max_attempts {
                    return Err(ListerError::LoginExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                let delay = policy.delay_after(attempt);
                warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Login failed, retrying");
                println!("❌ Login failed ({}), retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(backoff: Backoff) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            backoff,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        }
    }

    #[test]
    fn exponential_backoff_doubles_up_to_the_cap() {
        let p = policy(Backoff::Exponential);
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(2), Duration::from_millis(200));
        assert_eq!(p.delay_after(3), Duration::from_millis(400));
        assert_eq!(p.delay_after(4), Duration::from_millis(500));
        assert_eq!(p.delay_after(40), Duration::from_millis(500));
    }

    #[test]
    fn fixed_backoff_never_grows() {
        let p = policy(Backoff::Fixed);
        assert_eq!(p.delay_after(1), p.delay_after(4));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let config = LoginConfig {
            max_attempts: 0,
            ..LoginConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }
}
