//! Feed policies.
//!
//! A feed policy decides which buffer slices go into which descriptors and
//! turns completed descriptors back into byte counts. The engine owns the
//! rings and the interrupt plumbing; the policy owns the transfer session.
//!
//! - [`FeedPolicy`]: the capability the engine drives
//! - [`ContiguousFeed`]: one contiguous buffer per direction, fixed payload cap

pub mod contiguous;

pub use contiguous::{ContiguousFeed, FeedBuffers};

use crate::driver::config::Direction;
use crate::dma::DescriptorRing;
use crate::error::TransferResult;
use crate::hal::DmaChannel;

/// What one collect pass reclaimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Progress {
    /// Descriptors drained and released
    pub descriptors: usize,
    /// Bytes the hardware reported as transferred
    pub bytes: usize,
}

impl Progress {
    /// Check if nothing was reclaimed
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.descriptors == 0
    }
}

/// Descriptor feeding strategy for one transfer session.
pub trait FeedPolicy {
    /// Submit as many descriptors as the session and the rings allow.
    ///
    /// Only directions flagged ready are fed. Never allocates more than a
    /// ring reports free.
    fn queue<C: DmaChannel>(
        &mut self,
        tx: &mut DescriptorRing<'_, C>,
        rx: &mut DescriptorRing<'_, C>,
        tx_ready: bool,
        rx_ready: bool,
    );

    /// Drain completed descriptors of one direction, account their bytes and
    /// release them.
    ///
    /// A descriptor completed with an error status yields a
    /// [`TransferError`](crate::TransferError); the engine treats it like an
    /// error interrupt.
    fn collect<C: DmaChannel>(
        &mut self,
        direction: Direction,
        ring: &mut DescriptorRing<'_, C>,
    ) -> TransferResult<Progress>;

    /// Check if both directions have completed every byte
    fn is_complete(&self) -> bool;

    /// Bytes not yet acknowledged complete in one direction
    fn remaining(&self, direction: Direction) -> usize;
}

/// Descriptors to submit for `remaining` bytes at `max_payload` bytes each,
/// capped by the `free` descriptors available
///
/// `max_payload` must be non-zero.
#[must_use]
pub const fn descriptors_needed(remaining: usize, max_payload: usize, free: usize) -> usize {
    let needed = remaining.div_ceil(max_payload);
    if needed < free { needed } else { free }
}
