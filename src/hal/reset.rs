//! DMA reset with bounded retry
//!
//! Runs the recovery reset protocol: issue a reset, poll the reset-done
//! indicator a fixed number of times, and retry the whole reset a fixed
//! number of attempts before giving up.

use embedded_hal::delay::DelayNs;

use super::dma::DmaController;
use crate::driver::config::ResetPolicy;
use crate::error::{ConfigError, ConfigResult};

#[cfg(feature = "log")]
use log::warn;

// =============================================================================
// Delay
// =============================================================================

/// Delay provider that returns immediately (pure spin between polls)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    #[inline(always)]
    fn delay_ns(&mut self, _ns: u32) {}
}

// =============================================================================
// Reset Controller
// =============================================================================

/// Reset controller for the DMA device
#[derive(Debug)]
pub struct ResetController<W: DelayNs> {
    /// Delay provider
    delay: W,
    /// Retry budget
    policy: ResetPolicy,
}

impl<W: DelayNs> ResetController<W> {
    /// Create a new reset controller
    pub fn new(delay: W, policy: ResetPolicy) -> Self {
        Self { delay, policy }
    }

    /// Get the retry budget
    pub fn policy(&self) -> ResetPolicy {
        self.policy
    }

    /// Reset the DMA device, retrying up to the configured number of attempts
    ///
    /// Returns the attempt number (1-based) on which the reset completed, or
    /// `Err(ConfigError::ResetFailed)` when every attempt timed out.
    pub fn reset<D: DmaController>(&mut self, dma: &mut D) -> ConfigResult<u32> {
        for attempt in 1..=self.policy.attempts {
            dma.reset();
            if self.wait_reset_done(dma) {
                return Ok(attempt);
            }

            #[cfg(feature = "log")]
            warn!(
                "DMA reset attempt {attempt}/{} timed out",
                self.policy.attempts
            );
            #[cfg(feature = "defmt")]
            defmt::warn!("DMA reset attempt {} timed out", attempt);
        }

        Err(ConfigError::ResetFailed)
    }

    fn wait_reset_done<D: DmaController>(&mut self, dma: &D) -> bool {
        for _ in 0..self.policy.spins {
            if dma.reset_is_done() {
                return true;
            }
            if self.policy.poll_interval_ns > 0 {
                self.delay.delay_ns(self.policy.poll_interval_ns);
            }
        }
        false
    }
}

// =============================================================================
// Tests
// =============================================================================
