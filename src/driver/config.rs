//! Configuration types for the feed engine

use crate::constants::{
    DEFAULT_IRQ_PRIORITY, DEFAULT_MAX_PAYLOAD, MAX_COALESCE_COUNT, MAX_COALESCE_DELAY,
    MAX_PAYLOAD_LIMIT, RESET_ATTEMPTS, RESET_POLL_INTERVAL_NS, RESET_SPIN_LIMIT,
};
use crate::error::{ConfigError, ConfigResult};

/// Transfer direction of one half of the DMA channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Memory to stream (outbound, MM2S)
    Tx,
    /// Stream to memory (inbound, S2MM)
    Rx,
}

impl Direction {
    /// Both directions, Tx first
    pub const BOTH: [Direction; 2] = [Direction::Tx, Direction::Rx];

    /// Short name for diagnostics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Tx => "tx",
            Direction::Rx => "rx",
        }
    }
}

/// Interrupt coalescing setting for one ring
///
/// `None` in either field leaves the hardware value unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coalescing {
    /// Completions batched before an interrupt fires (1..=255)
    pub count: Option<u32>,
    /// Delay timer, in units of the channel's delay resolution (0..=255)
    pub delay: Option<u32>,
}

impl Coalescing {
    /// Leave both count and delay at their hardware values
    pub const NO_CHANGE: Self = Self {
        count: None,
        delay: None,
    };

    /// Coalesce `count` completions, falling back to `delay` timer ticks
    #[must_use]
    pub const fn new(count: u32, delay: u32) -> Self {
        Self {
            count: Some(count),
            delay: Some(delay),
        }
    }

    /// Only change the completion count
    #[must_use]
    pub const fn count(count: u32) -> Self {
        Self {
            count: Some(count),
            delay: None,
        }
    }

    /// Check the values against what the channel can hold
    pub const fn validate(&self) -> ConfigResult<()> {
        if let Some(count) = self.count {
            if count == 0 || count > MAX_COALESCE_COUNT {
                return Err(ConfigError::InvalidCoalescing);
            }
        }
        if let Some(delay) = self.delay {
            if delay > MAX_COALESCE_DELAY {
                return Err(ConfigError::InvalidCoalescing);
            }
        }
        Ok(())
    }
}

/// Bounded-retry budget for the DMA reset protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetPolicy {
    /// Reset attempts before the fault is treated as unrecoverable
    pub attempts: u32,
    /// Polls of the reset-done indicator per attempt
    pub spins: u32,
    /// Pause between polls in nanoseconds (0 = pure spin)
    pub poll_interval_ns: u32,
}

impl ResetPolicy {
    /// Create the default policy (5 attempts of 10 000 spins)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attempts: RESET_ATTEMPTS,
            spins: RESET_SPIN_LIMIT,
            poll_interval_ns: RESET_POLL_INTERVAL_NS,
        }
    }
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed engine configuration
///
/// All fields other than the identifiers have defaults and may be changed
/// with the `with_*` builder methods before the engine is constructed.
///
/// # Example
///
/// ```ignore
/// let config = FeedConfig::new(DMA_DEVICE_ID, MM2S_IRQ, S2MM_IRQ)
///     .with_max_payload(4096)
///     .with_rx_coalescing(Coalescing::new(8, 16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedConfig {
    /// DMA device identifier handed to [`DmaController::locate`](crate::hal::DmaController::locate)
    pub device_id: u32,
    /// Interrupt line of the Tx (MM2S) channel
    pub tx_irq: u32,
    /// Interrupt line of the Rx (S2MM) channel
    pub rx_irq: u32,
    /// Maximum payload bytes per descriptor
    pub max_payload: usize,
    /// Tx interrupt coalescing
    pub tx_coalescing: Coalescing,
    /// Rx interrupt coalescing
    pub rx_coalescing: Coalescing,
    /// Priority programmed for both interrupt lines
    pub irq_priority: u8,
    /// Reset retry budget
    pub reset: ResetPolicy,
}

impl FeedConfig {
    /// Create a configuration with default payload, coalescing and reset budget
    #[must_use]
    pub const fn new(device_id: u32, tx_irq: u32, rx_irq: u32) -> Self {
        Self {
            device_id,
            tx_irq,
            rx_irq,
            max_payload: DEFAULT_MAX_PAYLOAD,
            tx_coalescing: Coalescing::NO_CHANGE,
            rx_coalescing: Coalescing::NO_CHANGE,
            irq_priority: DEFAULT_IRQ_PRIORITY,
            reset: ResetPolicy::new(),
        }
    }

    /// Set the maximum payload bytes per descriptor
    #[must_use]
    pub const fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Set Tx interrupt coalescing
    #[must_use]
    pub const fn with_tx_coalescing(mut self, coalescing: Coalescing) -> Self {
        self.tx_coalescing = coalescing;
        self
    }

    /// Set Rx interrupt coalescing
    #[must_use]
    pub const fn with_rx_coalescing(mut self, coalescing: Coalescing) -> Self {
        self.rx_coalescing = coalescing;
        self
    }

    /// Set the interrupt controller priority for both lines
    #[must_use]
    pub const fn with_irq_priority(mut self, priority: u8) -> Self {
        self.irq_priority = priority;
        self
    }

    /// Set the reset retry budget
    #[must_use]
    pub const fn with_reset_policy(mut self, reset: ResetPolicy) -> Self {
        self.reset = reset;
        self
    }

    /// Coalescing for one direction
    #[must_use]
    pub const fn coalescing(&self, direction: Direction) -> Coalescing {
        match direction {
            Direction::Tx => self.tx_coalescing,
            Direction::Rx => self.rx_coalescing,
        }
    }

    /// Interrupt line for one direction
    #[must_use]
    pub const fn irq(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Tx => self.tx_irq,
            Direction::Rx => self.rx_irq,
        }
    }

    /// Validate everything that can be checked without hardware
    pub const fn validate(&self) -> ConfigResult<()> {
        if self.max_payload == 0 || self.max_payload > MAX_PAYLOAD_LIMIT {
            return Err(ConfigError::InvalidPayloadSize);
        }
        if self.reset.attempts == 0 || self.reset.spins == 0 {
            return Err(ConfigError::ResetFailed);
        }
        if let Err(e) = self.tx_coalescing.validate() {
            return Err(e);
        }
        self.rx_coalescing.validate()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
