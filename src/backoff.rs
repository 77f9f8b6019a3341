use std::time::Duration;

use rand::Rng;

/// Delay policy applied between failed connection cycles.
///
/// The default policy retries immediately, forever, with no jitter: a load
/// generator is expected to hammer an unresponsive target rather than ease
/// off. That behavior is deliberate but not hidden: callers that point this
/// tool at shared infrastructure can opt into exponential backoff with
/// [`ReconnectPolicy::backoff`], which grows the delay by `factor` per
/// consecutive failure, caps it at `delay_max`, and adds up to `jitter_ms`
/// milliseconds of random jitter to avoid synchronized reconnect storms.
///
/// A successful request cycle resets the delay to its initial value.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay_initial: Duration,
    delay_max: Duration,
    delay_current: Duration,
    factor: f64,
    jitter_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

impl ReconnectPolicy {
    /// Retry immediately on every failure, without limit. Reference behavior.
    pub const fn immediate() -> Self {
        Self {
            delay_initial: Duration::ZERO,
            delay_max: Duration::ZERO,
            delay_current: Duration::ZERO,
            factor: 1.0,
            jitter_ms: 0,
        }
    }

    /// Exponential backoff between failed cycles.
    pub fn backoff(
        delay_initial: Duration,
        delay_max: Duration,
        factor: f64,
        jitter_ms: u64,
    ) -> Self {
        Self {
            delay_initial,
            delay_max,
            delay_current: delay_initial,
            factor,
            jitter_ms,
        }
    }

    /// Return the delay to sleep before the next reconnect attempt and
    /// advance the internal state.
    pub fn next_delay(&mut self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        let delay = self.delay_current + Duration::from_millis(jitter);

        let next = self.delay_current.as_secs_f64() * self.factor;
        self.delay_current = self.delay_max.min(Duration::from_secs_f64(next));

        delay
    }

    /// Reset the delay to its initial value after a successful cycle.
    pub fn reset(&mut self) {
        self.delay_current = self.delay_initial;
    }

    /// The base delay the next failure would incur, before jitter.
    pub fn current_delay(&self) -> Duration {
        self.delay_current
    }
}
