//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// Delay grows as `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        /// Apply random +/- 50% jitter to the computed delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(800),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = (base.as_secs_f64() * scale).min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total = delay.as_millis() as i64 + (offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Shared retry policy for every fetch in a build run.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// HTTP status codes that trigger a retry.
    pub retry_on_status: Vec<u16>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Sleep 50-250ms before every request.
    pub request_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 6,
            backoff: Backoff::default(),
            retry_on_status: vec![429, 500, 502, 503, 504],
            timeout: Duration::from_secs(90),
            request_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Build the policy from `CARIBDATA_HTTP_*` environment overrides.
    ///
    /// `CARIBDATA_HTTP_RETRIES` (count), `CARIBDATA_HTTP_BACKOFF` (base
    /// seconds for the exponential delay), `CARIBDATA_HTTP_TIMEOUT`
    /// (seconds). Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_parts(
            std::env::var("CARIBDATA_HTTP_RETRIES").ok().as_deref(),
            std::env::var("CARIBDATA_HTTP_BACKOFF").ok().as_deref(),
            std::env::var("CARIBDATA_HTTP_TIMEOUT").ok().as_deref(),
        )
    }

    fn from_parts(retries: Option<&str>, backoff: Option<&str>, timeout: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(value) = retries.and_then(|v| v.parse::<u32>().ok()) {
            config.max_retries = value;
        }
        if let Some(value) = backoff.and_then(|v| v.parse::<f64>().ok()) {
            if value.is_finite() && value > 0.0 {
                config.backoff = Backoff::Exponential {
                    base: Duration::from_secs_f64(value),
                    factor: 2.0,
                    max: Duration::from_secs(30),
                    jitter: true,
                };
            }
        }
        if let Some(value) = timeout.and_then(|v| v.parse::<f64>().ok()) {
            if value.is_finite() && value > 0.0 {
                config.timeout = Duration::from_secs_f64(value);
            }
        }
        config
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(7), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
    }

    #[test]
    fn jittered_delay_stays_within_half_band() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(2),
            jitter: true,
        };
        for attempt in 0..4 {
            let expected = (200.0 * 2_f64.powi(attempt as i32)).min(2_000.0);
            let delay_ms = backoff.delay(attempt).as_millis() as f64;
            assert!(delay_ms >= expected * 0.49, "attempt {attempt}: {delay_ms}");
            assert!(delay_ms <= expected * 1.51, "attempt {attempt}: {delay_ms}");
        }
    }

    #[test]
    fn default_policy_retries_transient_statuses() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 6);
        for status in [429, 500, 502, 503, 504] {
            assert!(config.should_retry_status(status));
        }
        assert!(!config.should_retry_status(404));
        assert!(!config.should_retry_status(400));
    }

    #[test]
    fn env_overrides_parse_and_fall_back() {
        let config = RetryConfig::from_parts(Some("3"), Some("0.5"), Some("120"));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout, Duration::from_secs(120));
        match config.backoff {
            Backoff::Exponential { base, .. } => assert_eq!(base, Duration::from_millis(500)),
            Backoff::Fixed { .. } => panic!("expected exponential backoff"),
        }

        let config = RetryConfig::from_parts(Some("not-a-number"), None, Some("-4"));
        assert_eq!(config.max_retries, 6);
        assert_eq!(config.timeout, Duration::from_secs(90));
    }
}
