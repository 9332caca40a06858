//! Fixed-payload feed over one contiguous buffer per direction.
//!
//! Each direction walks its buffer front to back, cutting it into descriptors
//! of at most `max_payload` bytes. Outbound bursts are framed with SOF on the
//! first descriptor and EOF on the last; inbound descriptors carry no flags.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{FeedPolicy, Progress, descriptors_needed};
use crate::constants::{BUFFER_ALIGNMENT, MAX_PAYLOAD_LIMIT};
use crate::dma::DescriptorRing;
use crate::dma::descriptor::bits::ctrl;
use crate::driver::config::Direction;
use crate::error::{ConfigError, ConfigResult, TransferError, TransferResult, fatal};
use crate::hal::DmaChannel;

#[cfg(feature = "log")]
use log::{debug, warn};

// =============================================================================
// Lane
// =============================================================================

/// Session state of one direction
#[derive(Debug)]
struct Lane {
    /// Buffer start address
    base: usize,
    /// Requested bytes
    total: usize,
    /// Offset of the next unassigned byte
    offset: usize,
    /// Bytes not yet handed to a descriptor
    to_submit: usize,
    /// Bytes not yet acknowledged complete
    to_complete: AtomicUsize,
    /// Set once, when `to_complete` reaches zero
    complete: AtomicBool,
}

impl Lane {
    const fn empty() -> Self {
        Self {
            base: 0,
            total: 0,
            offset: 0,
            to_submit: 0,
            to_complete: AtomicUsize::new(0),
            complete: AtomicBool::new(true),
        }
    }

    fn load(&mut self, base: usize, len: usize) {
        self.base = base;
        self.total = len;
        self.offset = 0;
        self.to_submit = len;
        self.to_complete.store(len, Ordering::Release);
        // An empty direction has nothing to wait for
        self.complete.store(len == 0, Ordering::Release);
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    fn feed<C: DmaChannel>(
        &mut self,
        ring: &mut DescriptorRing<'_, C>,
        max_payload: usize,
        direction: Direction,
    ) {
        let n = descriptors_needed(self.to_submit, max_payload, ring.free_count());
        if n == 0 {
            return;
        }

        let span = ring.allocate(n);
        let last = span.last();
        for (i, index) in span.indices().enumerate() {
            let len = self.to_submit.min(max_payload);
            let flags = match direction {
                Direction::Tx => {
                    let mut flags = 0;
                    if i == 0 {
                        flags |= ctrl::TXSOF;
                    }
                    if Some(index) == last {
                        flags |= ctrl::TXEOF;
                    }
                    flags
                }
                Direction::Rx => 0,
            };
            ring.descriptor(index)
                .prepare(self.base + self.offset, len, flags, index as u32);
            self.offset += len;
            self.to_submit -= len;
        }
        ring.submit(span);
    }

    fn collect<C: DmaChannel>(
        &mut self,
        ring: &mut DescriptorRing<'_, C>,
    ) -> TransferResult<Progress> {
        let span = ring.drain_completed();
        if span.is_empty() {
            return Ok(Progress::default());
        }

        let mut bytes = 0;
        let mut fault = None;
        for index in span.indices() {
            let bd = ring.descriptor(index);
            let bits = bd.error_bits();
            if bits != 0 && fault.is_none() {
                fault = Some(TransferError::DescriptorStatus {
                    index: index as u16,
                    bits,
                });
            }
            bytes += bd.transferred_length();
        }
        ring.release(span);

        if let Some(err) = fault {
            return Err(err);
        }

        let outstanding = self.to_complete.load(Ordering::Acquire);
        if bytes > outstanding {
            fatal("completed bytes exceed outstanding transfer");
        }
        let left = outstanding - bytes;
        self.to_complete.store(left, Ordering::Release);
        if left == 0 && outstanding > 0 {
            self.complete.store(true, Ordering::Release);
        }

        Ok(Progress {
            descriptors: span.count(),
            bytes,
        })
    }
}

// =============================================================================
// Buffers
// =============================================================================

/// Payload buffers lent to one transfer.
///
/// The engine takes them by value when a transfer starts and hands them back
/// once the hardware is done with them, so neither buffer is reachable from
/// safe code while the DMA engine may still read or write it.
#[derive(Debug)]
pub struct FeedBuffers {
    /// Outbound data
    pub tx: &'static [u8],
    /// Inbound data, written by the DMA engine
    pub rx: &'static mut [u8],
}

impl FeedBuffers {
    /// Pair an outbound and an inbound buffer
    pub const fn new(tx: &'static [u8], rx: &'static mut [u8]) -> Self {
        Self { tx, rx }
    }

    fn is_aligned(&self) -> bool {
        is_dma_aligned(self.tx) && is_dma_aligned(&*self.rx)
    }
}

/// Empty buffers are never handed to hardware, so any address will do
fn is_dma_aligned(buf: &[u8]) -> bool {
    buf.is_empty() || (buf.as_ptr() as usize) % BUFFER_ALIGNMENT == 0
}

// =============================================================================
// Contiguous Feed
// =============================================================================

/// Feed policy for one contiguous outbound and one contiguous inbound buffer.
///
/// Holds the session's [`FeedBuffers`] from [`load`](Self::load) until the
/// engine releases them; the inbound data can be inspected through
/// [`received`](Self::received) once the inbound direction has completed.
#[derive(Debug)]
pub struct ContiguousFeed {
    max_payload: usize,
    tx: Lane,
    rx: Lane,
    buffers: Option<FeedBuffers>,
}

impl ContiguousFeed {
    /// Create an empty feed with a per-descriptor payload cap
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidPayloadSize` if `max_payload` is zero or exceeds
    /// the descriptor length field.
    pub const fn new(max_payload: usize) -> ConfigResult<Self> {
        if max_payload == 0 || max_payload > MAX_PAYLOAD_LIMIT {
            return Err(ConfigError::InvalidPayloadSize);
        }
        Ok(Self {
            max_payload,
            tx: Lane::empty(),
            rx: Lane::empty(),
            buffers: None,
        })
    }

    /// Load a new session.
    ///
    /// A zero-length direction is complete immediately and never receives a
    /// descriptor.
    ///
    /// # Errors
    ///
    /// The buffers come back with the error:
    /// - `ConfigError::BuffersInUse` if the previous session's buffers were
    ///   not released
    /// - `ConfigError::MisalignedBuffer` if a non-empty buffer does not start
    ///   on a [`BUFFER_ALIGNMENT`] boundary
    pub fn load(&mut self, buffers: FeedBuffers) -> Result<(), (ConfigError, FeedBuffers)> {
        if self.buffers.is_some() {
            return Err((ConfigError::BuffersInUse, buffers));
        }
        if !buffers.is_aligned() {
            return Err((ConfigError::MisalignedBuffer, buffers));
        }

        self.tx.load(buffers.tx.as_ptr() as usize, buffers.tx.len());
        self.rx.load(buffers.rx.as_ptr() as usize, buffers.rx.len());

        #[cfg(feature = "log")]
        debug!(
            "feed loaded: tx {} bytes, rx {} bytes",
            buffers.tx.len(),
            buffers.rx.len()
        );
        self.buffers = Some(buffers);
        Ok(())
    }

    /// Give the session's buffers back and return to the empty state.
    ///
    /// Only the engine calls this, once hardware can no longer touch the
    /// buffers.
    pub(crate) fn release(&mut self) -> Option<FeedBuffers> {
        self.tx = Lane::empty();
        self.rx = Lane::empty();
        self.buffers.take()
    }

    /// Check if a session's buffers are held
    #[must_use]
    pub fn holds_buffers(&self) -> bool {
        self.buffers.is_some()
    }

    /// Per-descriptor payload cap
    #[must_use]
    pub const fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Requested bytes in one direction
    #[must_use]
    pub fn total(&self, direction: Direction) -> usize {
        self.lane(direction).total
    }

    /// Bytes not yet handed to a descriptor in one direction
    #[must_use]
    pub fn unsubmitted(&self, direction: Direction) -> usize {
        self.lane(direction).to_submit
    }

    /// Check if one direction has completed every byte
    #[must_use]
    pub fn is_direction_complete(&self, direction: Direction) -> bool {
        self.lane(direction).is_complete()
    }

    /// The inbound buffer, once every inbound byte has completed
    #[must_use]
    pub fn received(&self) -> Option<&[u8]> {
        match &self.buffers {
            Some(buffers) if self.rx.is_complete() && !buffers.rx.is_empty() => Some(&*buffers.rx),
            _ => None,
        }
    }

    fn lane(&self, direction: Direction) -> &Lane {
        match direction {
            Direction::Tx => &self.tx,
            Direction::Rx => &self.rx,
        }
    }
}

impl FeedPolicy for ContiguousFeed {
    fn queue<C: DmaChannel>(
        &mut self,
        tx: &mut DescriptorRing<'_, C>,
        rx: &mut DescriptorRing<'_, C>,
        tx_ready: bool,
        rx_ready: bool,
    ) {
        if tx_ready {
            self.tx.feed(tx, self.max_payload, Direction::Tx);
        }
        if rx_ready {
            self.rx.feed(rx, self.max_payload, Direction::Rx);
        }
    }

    fn collect<C: DmaChannel>(
        &mut self,
        direction: Direction,
        ring: &mut DescriptorRing<'_, C>,
    ) -> TransferResult<Progress> {
        let lane = match direction {
            Direction::Tx => &mut self.tx,
            Direction::Rx => &mut self.rx,
        };
        let result = lane.collect(ring);

        #[cfg(feature = "log")]
        if let Err(err) = &result {
            warn!("{} descriptor fault: {err}", direction.as_str());
        }
        #[cfg(feature = "defmt")]
        if let Err(err) = &result {
            defmt::warn!("{} descriptor fault: {}", direction.as_str(), err);
        }

        result
    }

    fn is_complete(&self) -> bool {
        self.tx.is_complete() && self.rx.is_complete()
    }

    fn remaining(&self, direction: Direction) -> usize {
        self.lane(direction).to_complete.load(Ordering::Acquire)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::dma::DescriptorStorage;
    use crate::dma::descriptor::bits::sts;
    use crate::testing::{Lcg, MockChannel, complete_in_flight, fail_in_flight, static_buffer};

    fn ring<'a>(storage: &'a [crate::dma::BufferDescriptor]) -> DescriptorRing<'a, MockChannel> {
        let mut ring = DescriptorRing::new(storage);
        ring.attach(MockChannel::new());
        ring.create().unwrap();
        ring
    }

    fn lengths(ring: &DescriptorRing<'_, MockChannel>) -> std::vec::Vec<usize> {
        ring.in_flight_span()
            .indices()
            .map(|i| ring.descriptor(i).requested_length())
            .collect()
    }

    /// Zeroed buffers of `tx` and `rx` bytes
    fn buffers(tx: usize, rx: usize) -> FeedBuffers {
        FeedBuffers::new(static_buffer(tx), static_buffer(rx))
    }

    // =========================================================================
    // Construction Tests
    // =========================================================================

    #[test]
    fn payload_cap_validated() {
        assert_eq!(
            ContiguousFeed::new(0).err(),
            Some(ConfigError::InvalidPayloadSize)
        );
        assert_eq!(
            ContiguousFeed::new(MAX_PAYLOAD_LIMIT + 1).err(),
            Some(ConfigError::InvalidPayloadSize)
        );
        assert_eq!(ContiguousFeed::new(4).unwrap().max_payload(), 4);
    }

    #[test]
    fn unloaded_feed_is_complete() {
        let feed = ContiguousFeed::new(4).unwrap();
        assert!(feed.is_complete());
        assert!(!feed.holds_buffers());
        assert_eq!(feed.remaining(Direction::Tx), 0);
        assert_eq!(feed.received(), None);
    }

    #[test]
    fn misaligned_buffer_rejected() {
        let mut feed = ContiguousFeed::new(4).unwrap();

        let (err, returned) = feed
            .load(FeedBuffers::new(&static_buffer(16)[1..], static_buffer(16)))
            .unwrap_err();
        assert_eq!(err, ConfigError::MisalignedBuffer);
        assert_eq!(returned.tx.len(), 15);

        let (err, returned) = feed
            .load(FeedBuffers::new(static_buffer(16), &mut static_buffer(16)[2..]))
            .unwrap_err();
        assert_eq!(err, ConfigError::MisalignedBuffer);
        assert_eq!(returned.rx.len(), 14);
        assert!(!feed.holds_buffers());
    }

    #[test]
    fn empty_buffer_alignment_ignored() {
        let mut feed = ContiguousFeed::new(4).unwrap();
        assert!(
            feed.load(FeedBuffers::new(&static_buffer(16)[3..3], static_buffer(16)))
                .is_ok()
        );
    }

    #[test]
    fn load_refused_until_buffers_released() {
        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(buffers(8, 8)).unwrap();

        let (err, _) = feed.load(buffers(4, 4)).unwrap_err();
        assert_eq!(err, ConfigError::BuffersInUse);
        assert_eq!(feed.total(Direction::Tx), 8, "held session untouched");

        let released = feed.release().unwrap();
        assert_eq!((released.tx.len(), released.rx.len()), (8, 8));
        assert!(feed.is_complete());
        assert_eq!(feed.total(Direction::Rx), 0);

        // The same memory serves the next session
        feed.load(released).unwrap();
        assert_eq!(feed.total(Direction::Rx), 8);
    }

    // =========================================================================
    // Queue Tests
    // =========================================================================

    #[test]
    fn ten_bytes_at_four_per_descriptor() {
        let storage_tx = DescriptorStorage::<8>::new();
        let storage_rx = DescriptorStorage::<8>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());
        let session = buffers(10, 10);
        let rx_base = session.rx.as_ptr() as u64;

        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(session).unwrap();
        feed.queue(&mut tx_ring, &mut rx_ring, true, true);

        assert_eq!(lengths(&tx_ring), [4, 4, 2]);
        assert_eq!(lengths(&rx_ring), [4, 4, 2]);
        assert_eq!(feed.unsubmitted(Direction::Tx), 0);
        assert_eq!(feed.remaining(Direction::Tx), 10);

        // Framing and identity
        let flags: std::vec::Vec<u32> = (0..3)
            .map(|i| tx_ring.descriptor(i).control_flags())
            .collect();
        assert_eq!(flags, [ctrl::TXSOF, 0, ctrl::TXEOF]);
        for i in 0..3 {
            assert_eq!(rx_ring.descriptor(i).control_flags(), 0);
            assert_eq!(rx_ring.descriptor(i).id(), i as u32);
            assert_eq!(rx_ring.descriptor(i).buffer_addr(), rx_base + 4 * i as u64);
        }
    }

    #[test]
    fn single_descriptor_burst_has_both_flags() {
        let storage_tx = DescriptorStorage::<4>::new();
        let storage_rx = DescriptorStorage::<4>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());

        let mut feed = ContiguousFeed::new(8).unwrap();
        feed.load(buffers(3, 0)).unwrap();
        feed.queue(&mut tx_ring, &mut rx_ring, true, true);

        assert_eq!(
            tx_ring.descriptor(0).control_flags(),
            ctrl::TXSOF | ctrl::TXEOF
        );
        assert_eq!(rx_ring.in_flight(), 0);
    }

    #[test]
    fn backpressure_limits_allocation() {
        let storage_tx = DescriptorStorage::<2>::new();
        let storage_rx = DescriptorStorage::<2>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());

        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(buffers(10, 10)).unwrap();
        feed.queue(&mut tx_ring, &mut rx_ring, true, true);
        assert_eq!(lengths(&tx_ring), [4, 4]);
        assert_eq!(tx_ring.free_count(), 0);

        // Ring full: another queue is a no-op
        feed.queue(&mut tx_ring, &mut rx_ring, true, true);
        assert_eq!(tx_ring.in_flight(), 2);

        complete_in_flight(&tx_ring, 1);
        assert_eq!(feed.collect(Direction::Tx, &mut tx_ring).unwrap().bytes, 4);
        feed.queue(&mut tx_ring, &mut rx_ring, true, false);
        assert_eq!(lengths(&tx_ring), [4, 2]);
        // Second burst starts a new frame
        assert_eq!(
            tx_ring.descriptor(0).control_flags(),
            ctrl::TXSOF | ctrl::TXEOF
        );
    }

    #[test]
    fn queue_honors_ready_flags() {
        let storage_tx = DescriptorStorage::<4>::new();
        let storage_rx = DescriptorStorage::<4>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());

        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(buffers(8, 8)).unwrap();
        feed.queue(&mut tx_ring, &mut rx_ring, false, true);

        assert_eq!(tx_ring.in_flight(), 0);
        assert_eq!(rx_ring.in_flight(), 2);
    }

    #[test]
    fn zero_length_direction_complete_at_load() {
        let storage_tx = DescriptorStorage::<4>::new();
        let storage_rx = DescriptorStorage::<4>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());

        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(buffers(8, 0)).unwrap();
        assert!(feed.is_direction_complete(Direction::Rx));
        assert!(!feed.is_direction_complete(Direction::Tx));

        feed.queue(&mut tx_ring, &mut rx_ring, true, true);
        assert_eq!(rx_ring.in_flight(), 0);
        assert_eq!(rx_ring.free_count(), 4);
        assert_eq!(feed.received(), None);
    }

    // =========================================================================
    // Collect Tests
    // =========================================================================

    #[test]
    fn collect_counts_down_to_completion() {
        let storage_tx = DescriptorStorage::<8>::new();
        let storage_rx = DescriptorStorage::<8>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());

        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(buffers(10, 10)).unwrap();
        feed.queue(&mut tx_ring, &mut rx_ring, true, true);

        // Nothing completed yet
        assert!(feed.collect(Direction::Rx, &mut rx_ring).unwrap().is_empty());

        complete_in_flight(&rx_ring, 2);
        let progress = feed.collect(Direction::Rx, &mut rx_ring).unwrap();
        assert_eq!(progress, Progress { descriptors: 2, bytes: 8 });
        assert_eq!(feed.remaining(Direction::Rx), 2);
        assert!(!feed.is_direction_complete(Direction::Rx));
        assert_eq!(feed.received(), None);

        complete_in_flight(&rx_ring, 1);
        feed.collect(Direction::Rx, &mut rx_ring).unwrap();
        assert!(feed.is_direction_complete(Direction::Rx));
        assert_eq!(feed.received().map(<[u8]>::len), Some(10));
        assert!(!feed.is_complete(), "tx still outstanding");

        complete_in_flight(&tx_ring, 3);
        feed.collect(Direction::Tx, &mut tx_ring).unwrap();
        assert!(feed.is_complete());
        assert_eq!(tx_ring.free_count(), 8);
        assert_eq!(rx_ring.free_count(), 8);
    }

    #[test]
    fn descriptor_error_reported_and_released() {
        let storage_tx = DescriptorStorage::<8>::new();
        let storage_rx = DescriptorStorage::<8>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());

        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(buffers(8, 8)).unwrap();
        feed.queue(&mut tx_ring, &mut rx_ring, true, true);

        complete_in_flight(&tx_ring, 1);
        fail_in_flight(&tx_ring, sts::DEC_ERR);
        assert_eq!(
            feed.collect(Direction::Tx, &mut tx_ring),
            Err(TransferError::DescriptorStatus {
                index: 1,
                bits: sts::DEC_ERR
            })
        );
        assert_eq!(tx_ring.free_count(), 8);
        assert!(!feed.is_direction_complete(Direction::Tx));
    }

    #[test]
    #[should_panic(expected = "exceed outstanding")]
    fn over_completion_is_fatal() {
        let storage_tx = DescriptorStorage::<4>::new();
        let storage_rx = DescriptorStorage::<4>::new();
        let mut tx_ring = ring(storage_tx.as_slice());
        let mut rx_ring = ring(storage_rx.as_slice());

        let mut feed = ContiguousFeed::new(4).unwrap();
        feed.load(buffers(4, 4)).unwrap();
        feed.queue(&mut tx_ring, &mut rx_ring, true, true);

        tx_ring.descriptor(0).write_back(64, 0);
        let _ = feed.collect(Direction::Tx, &mut tx_ring);
    }

    // =========================================================================
    // Property Tests
    // =========================================================================

    #[test]
    fn random_sessions_conserve_bytes() {
        const CAP: usize = 16;
        let mut rng = Lcg::new(0x5eed);

        for _ in 0..200 {
            let storage_tx = DescriptorStorage::<CAP>::new();
            let storage_rx = DescriptorStorage::<CAP>::new();
            let capacity = 1 + rng.below(CAP);
            let mut tx_ring = ring(&storage_tx.as_slice()[..capacity]);
            let mut rx_ring = ring(&storage_rx.as_slice()[..capacity]);

            let tx_len = rng.below(513);
            let rx_len = rng.below(513);
            let payload = 1 + rng.below(64);
            let mut feed = ContiguousFeed::new(payload).unwrap();
            feed.load(buffers(tx_len, rx_len)).unwrap();

            let mut descriptors = [0usize; 2];
            let mut bytes = [0usize; 2];
            let mut last_remaining = [tx_len, rx_len];

            while !feed.is_complete() {
                let free_before = [tx_ring.free_count(), rx_ring.free_count()];
                let flight_before = [tx_ring.in_flight(), rx_ring.in_flight()];
                feed.queue(&mut tx_ring, &mut rx_ring, true, true);
                assert!(tx_ring.in_flight() - flight_before[0] <= free_before[0]);
                assert!(rx_ring.in_flight() - flight_before[1] <= free_before[1]);

                for (i, (direction, ring)) in [
                    (Direction::Tx, &mut tx_ring),
                    (Direction::Rx, &mut rx_ring),
                ]
                .into_iter()
                .enumerate()
                {
                    let in_flight = ring.in_flight();
                    complete_in_flight(ring, rng.below(in_flight + 1));
                    let progress = feed.collect(direction, ring).unwrap();
                    descriptors[i] += progress.descriptors;
                    bytes[i] += progress.bytes;

                    let remaining = feed.remaining(direction);
                    assert!(remaining <= last_remaining[i]);
                    last_remaining[i] = remaining;
                }
            }

            assert_eq!(bytes, [tx_len, rx_len]);
            assert_eq!(
                descriptors,
                [tx_len.div_ceil(payload), rx_len.div_ceil(payload)]
            );
            assert_eq!(tx_ring.free_count(), capacity);
            assert_eq!(rx_ring.free_count(), capacity);

            let released = feed.release().unwrap();
            assert_eq!((released.tx.len(), released.rx.len()), (tx_len, rx_len));
        }
    }
}
