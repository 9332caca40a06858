//! Descriptor ring bookkeeping for one DMA channel.
//!
//! Ring slots move through four groups in ring order:
//!
//! ```text
//!   free -> allocated -> hardware -> completed -> free
//! ```
//!
//! Each group is a contiguous (wrapping) run of indices, so a group is fully
//! described by its head index and count. The completed group is followed by
//! the hardware group, then the allocated group, then the free group.

use super::descriptor::BufferDescriptor;
use crate::driver::config::Coalescing;
use crate::error::{ConfigError, ConfigResult, fatal};
use crate::hal::DmaChannel;

// =============================================================================
// Descriptor Span
// =============================================================================

/// A contiguous (wrapping) run of ring slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorSpan {
    first: usize,
    count: usize,
    capacity: usize,
}

impl DescriptorSpan {
    const fn new(first: usize, count: usize, capacity: usize) -> Self {
        Self {
            first,
            count,
            capacity,
        }
    }

    /// Index of the first slot
    #[inline(always)]
    #[must_use]
    pub const fn first(&self) -> usize {
        self.first
    }

    /// Number of slots
    #[inline(always)]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Check if the span holds no slots
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Index of the last slot, if any
    #[must_use]
    pub const fn last(&self) -> Option<usize> {
        if self.count == 0 {
            None
        } else {
            Some((self.first + self.count - 1) % self.capacity)
        }
    }

    /// Ring indices covered by the span, in ring order
    pub fn indices(&self) -> impl Iterator<Item = usize> + Clone + use<> {
        let (first, capacity) = (self.first, self.capacity);
        (0..self.count).map(move |i| (first + i) % capacity)
    }
}

// =============================================================================
// Descriptor Ring
// =============================================================================

/// Ring of buffer descriptors driving one DMA channel.
///
/// The descriptor memory is borrowed for `'a`; the channel handle is attached
/// during ring acquisition and replaced after every reset.
pub struct DescriptorRing<'a, C: DmaChannel> {
    descriptors: &'a [BufferDescriptor],
    channel: Option<C>,
    created: bool,
    free_head: usize,
    free_cnt: usize,
    pre_head: usize,
    pre_cnt: usize,
    hw_head: usize,
    hw_cnt: usize,
    post_head: usize,
    post_cnt: usize,
}

impl<'a, C: DmaChannel> DescriptorRing<'a, C> {
    /// Create an unconfigured ring over `descriptors`
    #[must_use]
    pub const fn new(descriptors: &'a [BufferDescriptor]) -> Self {
        Self {
            descriptors,
            channel: None,
            created: false,
            free_head: 0,
            free_cnt: 0,
            pre_head: 0,
            pre_cnt: 0,
            hw_head: 0,
            hw_cnt: 0,
            post_head: 0,
            post_cnt: 0,
        }
    }

    /// Attach the channel this ring feeds, replacing any previous handle
    pub fn attach(&mut self, channel: C) {
        self.channel = Some(channel);
    }

    /// Get the attached channel
    #[must_use]
    pub fn channel(&self) -> Option<&C> {
        self.channel.as_ref()
    }

    /// Link every slot into a circular chain and mark all of them free.
    ///
    /// Does nothing if the ring is already configured. Fails if the region
    /// holds no descriptors, no channel is attached, or the channel is running.
    pub fn create(&mut self) -> ConfigResult<()> {
        if self.created {
            return Ok(());
        }
        let running = match &self.channel {
            Some(channel) => channel.is_running(),
            None => return Err(ConfigError::RingSetupRejected),
        };
        if self.descriptors.is_empty() || running {
            return Err(ConfigError::RingSetupRejected);
        }

        let n = self.descriptors.len();
        for (i, bd) in self.descriptors.iter().enumerate() {
            bd.reset();
            bd.link(&self.descriptors[(i + 1) % n]);
        }

        self.free_head = 0;
        self.free_cnt = n;
        self.pre_head = 0;
        self.pre_cnt = 0;
        self.hw_head = 0;
        self.hw_cnt = 0;
        self.post_head = 0;
        self.post_cnt = 0;
        self.created = true;
        Ok(())
    }

    /// Forget the ring configuration so the next [`create`](Self::create)
    /// rebuilds it (used after a DMA reset)
    pub fn invalidate(&mut self) {
        self.created = false;
    }

    /// Check if the ring is configured
    #[inline(always)]
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.created
    }

    /// Number of descriptor slots in the ring
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.descriptors.len()
    }

    /// Slots available for [`allocate`](Self::allocate)
    #[inline(always)]
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.free_cnt
    }

    /// Slots allocated but not yet submitted
    #[inline(always)]
    #[must_use]
    pub const fn allocated(&self) -> usize {
        self.pre_cnt
    }

    /// Slots owned by hardware
    #[inline(always)]
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.hw_cnt
    }

    /// The run of slots currently owned by hardware
    #[must_use]
    pub const fn in_flight_span(&self) -> DescriptorSpan {
        DescriptorSpan::new(self.hw_head, self.hw_cnt, self.descriptors.len())
    }

    /// Slots drained from hardware but not yet released
    #[inline(always)]
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.post_cnt
    }

    /// Get the descriptor in slot `index`
    #[inline(always)]
    #[must_use]
    pub fn descriptor(&self, index: usize) -> &'a BufferDescriptor {
        let descriptors = self.descriptors;
        &descriptors[index % descriptors.len()]
    }

    /// Take `n` free slots for the caller to prepare.
    ///
    /// # Panics
    ///
    /// Stops the program if `n` exceeds [`free_count`](Self::free_count) or the
    /// ring is not configured.
    pub fn allocate(&mut self, n: usize) -> DescriptorSpan {
        self.ensure_created();
        if n > self.free_cnt {
            fatal("descriptor allocation exceeds free count");
        }
        let span = DescriptorSpan::new(self.free_head, n, self.capacity());
        self.free_head = self.wrap(self.free_head + n);
        self.free_cnt -= n;
        self.pre_cnt += n;
        span
    }

    /// Hand an allocated span to hardware.
    ///
    /// Spans must be submitted in allocation order. If the channel is running
    /// the tail pointer is advanced to the last descriptor of the span.
    pub fn submit(&mut self, span: DescriptorSpan) {
        self.ensure_created();
        if span.is_empty() {
            return;
        }
        if span.first != self.pre_head || span.count > self.pre_cnt {
            fatal("descriptor span submitted out of order");
        }

        for index in span.indices() {
            self.descriptors[index].clear_status();
        }
        self.pre_head = self.wrap(self.pre_head + span.count);
        self.pre_cnt -= span.count;
        self.hw_cnt += span.count;

        if let (Some(channel), Some(last)) = (self.channel.as_mut(), span.last()) {
            if channel.is_running() {
                channel.set_tail_descriptor(self.descriptors[last].addr());
            }
        }
    }

    /// Take every descriptor hardware has marked complete, in ring order.
    ///
    /// Stops at the first descriptor still owned by hardware; the returned
    /// span may be empty.
    pub fn drain_completed(&mut self) -> DescriptorSpan {
        self.ensure_created();
        let first = self.hw_head;
        let count = (0..self.hw_cnt)
            .take_while(|&i| self.descriptors[self.wrap(first + i)].is_complete())
            .count();

        self.hw_head = self.wrap(self.hw_head + count);
        self.hw_cnt -= count;
        self.post_cnt += count;
        DescriptorSpan::new(first, count, self.capacity())
    }

    /// Check, without side effects, whether hardware has completed a
    /// descriptor that has not been drained
    #[must_use]
    pub fn has_undrained_completions(&self) -> bool {
        self.created && self.hw_cnt > 0 && self.descriptors[self.hw_head].is_complete()
    }

    /// Return a drained span to the free group.
    ///
    /// Spans must be released in drain order.
    pub fn release(&mut self, span: DescriptorSpan) {
        self.ensure_created();
        if span.is_empty() {
            return;
        }
        if span.first != self.post_head || span.count > self.post_cnt {
            fatal("descriptor span released out of order");
        }

        for index in span.indices() {
            self.descriptors[index].reset();
        }
        self.post_head = self.wrap(self.post_head + span.count);
        self.post_cnt -= span.count;
        self.free_cnt += span.count;
    }

    /// Start the channel on this ring.
    ///
    /// Writes the current-descriptor pointer, sets run/stop, and passes any
    /// already-submitted descriptors to hardware through the tail pointer.
    pub fn start(&mut self) -> ConfigResult<()> {
        if !self.created {
            return Err(ConfigError::RingSetupRejected);
        }
        let head = self.descriptors[self.hw_head].addr();
        let tail = match self.hw_cnt {
            0 => None,
            n => Some(self.descriptors[self.wrap(self.hw_head + n - 1)].addr()),
        };
        let channel = self
            .channel
            .as_mut()
            .ok_or(ConfigError::RingSetupRejected)?;

        if !channel.is_running() {
            channel.set_current_descriptor(head);
            channel.run();
        }
        if let Some(tail) = tail {
            channel.set_tail_descriptor(tail);
        }
        Ok(())
    }

    /// Program interrupt coalescing for the channel
    pub fn set_coalescing(&mut self, coalescing: Coalescing) -> ConfigResult<()> {
        coalescing.validate()?;
        match self.channel.as_mut() {
            Some(channel) => channel.set_coalescing(coalescing),
            None => Err(ConfigError::RingSetupRejected),
        }
    }

    /// Enable channel interrupt sources
    pub fn enable_interrupts(&mut self, mask: u32) {
        if let Some(channel) = self.channel.as_mut() {
            channel.enable_interrupts(mask);
        }
    }

    /// Disable channel interrupt sources
    pub fn disable_interrupts(&mut self, mask: u32) {
        if let Some(channel) = self.channel.as_mut() {
            channel.disable_interrupts(mask);
        }
    }

    /// Read and acknowledge pending interrupt bits, returning them
    pub fn take_irq(&mut self, mask: u32) -> u32 {
        match self.channel.as_mut() {
            Some(channel) => {
                let status = channel.irq_status() & mask;
                channel.ack_irq(status);
                status
            }
            None => 0,
        }
    }

    #[inline(always)]
    fn wrap(&self, index: usize) -> usize {
        index % self.descriptors.len()
    }

    #[inline(always)]
    fn ensure_created(&self) {
        if !self.created {
            fatal("descriptor ring used before configuration");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
