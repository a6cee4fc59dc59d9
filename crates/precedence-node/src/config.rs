use std::time::Duration;

/// Delay schedule between registration attempts. Retries never stop; only
/// the spacing changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Fixed { delay: Duration },
    /// Doubles per attempt starting at `base`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Fixed {
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following failed attempt number `attempt`
    /// (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            RetryPolicy::Fixed { delay } => delay,
            RetryPolicy::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(20);
                let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(max).max(base)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    /// Forwarded as the `store` query parameter.
    pub store: bool,
    pub retry: RetryPolicy,
}
