//! Channel interrupt status decoding.
//!
//! This module provides the [`IrqStatus`] structure for parsing the
//! interrupt bits a DMA channel reports.

use crate::dma::descriptor::bits::irq;

// =============================================================================
// Interrupt Status
// =============================================================================

/// Interrupt status flags parsed from a channel status register.
///
/// # Example
///
/// ```ignore
/// let status = IrqStatus::from_raw(ring.take_irq(irq::ALL));
/// if status.has_error() {
///     // latch the error for the next poll
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqStatus {
    /// Interrupt on complete - coalescing count reached
    pub complete: bool,
    /// Delay timer expired with completions pending
    pub delay: bool,
    /// Error - internal, slave, decode or scatter-gather error
    pub error: bool,
}

impl IrqStatus {
    /// Create from raw channel status value
    #[inline]
    pub fn from_raw(status: u32) -> Self {
        Self {
            complete: (status & irq::IOC) != 0,
            delay: (status & irq::DELAY) != 0,
            error: (status & irq::ERROR) != 0,
        }
    }

    /// Convert to raw value for acknowledging (write-1-to-clear)
    #[inline]
    pub fn to_raw(&self) -> u32 {
        let mut val = 0u32;
        if self.complete {
            val |= irq::IOC;
        }
        if self.delay {
            val |= irq::DELAY;
        }
        if self.error {
            val |= irq::ERROR;
        }
        val
    }

    /// Check if any recognized interrupt occurred
    #[inline]
    pub fn any(&self) -> bool {
        self.complete || self.delay || self.error
    }

    /// Check if the error interrupt occurred
    #[inline]
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Check if descriptors may have completed
    #[inline]
    pub fn has_completion(&self) -> bool {
        self.complete || self.delay
    }
}

// =============================================================================
// Tests
// =============================================================================
