//! Feed engine core: lifecycle, interrupt dispatch and error recovery.
//!
//! ```text
//!            start()                   both directions complete
//!   Idle ---------------> Busy ------------------------------> Idle
//!                          |
//!                          | error interrupt / descriptor fault
//!                          v
//!                     (sticky error) --poll()--> reset --> IdleError --> Idle
//! ```
//!
//! The engine is driven from two contexts: the main loop calls
//! [`start`](FeedEngine::start) and [`poll`](FeedEngine::poll), the platform
//! interrupt glue calls [`handle_interrupt`](FeedEngine::handle_interrupt).
//! Flags crossing those contexts are atomics; with the `critical-section`
//! feature, `sync::SharedFeed` holds the engine for both contexts.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;

use super::binding::InterruptBinding;
use super::config::{Direction, FeedConfig};
use super::interrupt::IrqStatus;
use super::state::FeedState;
use crate::dma::descriptor::bits::irq;
use crate::dma::{BufferDescriptor, DescriptorRing};
use crate::error::{ConfigError, ConfigResult, TransferError, fatal};
use crate::hal::{DmaController, InterruptController, NoDelay, ResetController};
use crate::policy::{ContiguousFeed, FeedBuffers, FeedPolicy};

#[cfg(feature = "log")]
use log::{debug, warn};

/// Scatter-gather feed engine.
///
/// # Type Parameters
/// * `D` - DMA device
/// * `I` - Platform interrupt controller (often `&mut` a process-wide one)
/// * `P` - Feed policy, [`ContiguousFeed`] by default
/// * `W` - Delay used between reset polls, [`NoDelay`] by default
pub struct FeedEngine<
    'a,
    D: DmaController,
    I: InterruptController,
    P: FeedPolicy = ContiguousFeed,
    W: DelayNs = NoDelay,
> {
    config: FeedConfig,
    dma: D,
    tx_ring: DescriptorRing<'a, D::Channel>,
    rx_ring: DescriptorRing<'a, D::Channel>,
    binding: InterruptBinding<I>,
    policy: P,
    reset: ResetController<W>,
    /// Both rings configured against the current DMA instance
    rings_up: bool,
    /// A transfer was started and its outcome not yet reported
    busy: bool,
    /// Set from interrupt context when both directions complete
    done: AtomicBool,
    /// Sticky hardware error, cleared by recovery in `poll`
    dma_error: AtomicBool,
    /// Error behind the latest sticky error, kept until the next start
    fault: Option<TransferError>,
}

impl<'a, D, I, P> FeedEngine<'a, D, I, P, NoDelay>
where
    D: DmaController,
    I: InterruptController,
    P: FeedPolicy,
{
    /// Create an engine and acquire both descriptor rings.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from configuration validation, device lookup or
    /// ring setup.
    pub fn new(
        config: FeedConfig,
        dma: D,
        intc: I,
        policy: P,
        tx_region: &'a [BufferDescriptor],
        rx_region: &'a [BufferDescriptor],
    ) -> ConfigResult<Self> {
        Self::with_delay(config, dma, intc, policy, tx_region, rx_region, NoDelay)
    }
}

impl<'a, D, I> FeedEngine<'a, D, I, ContiguousFeed, NoDelay>
where
    D: DmaController,
    I: InterruptController,
{
    /// Create an engine with a [`ContiguousFeed`] capped at the configured
    /// maximum payload
    pub fn contiguous(
        config: FeedConfig,
        dma: D,
        intc: I,
        tx_region: &'a [BufferDescriptor],
        rx_region: &'a [BufferDescriptor],
    ) -> ConfigResult<Self> {
        let policy = ContiguousFeed::new(config.max_payload)?;
        Self::new(config, dma, intc, policy, tx_region, rx_region)
    }
}

impl<D, I, W> FeedEngine<'_, D, I, ContiguousFeed, W>
where
    D: DmaController,
    I: InterruptController,
    W: DelayNs,
{
    /// Start a transfer of `buffers.tx` out and `buffers.rx.len()` bytes in.
    ///
    /// Both buffers must be 4-byte aligned (empty buffers excepted). The
    /// engine holds them until the transfer is over; get them back with
    /// [`take_buffers`](Self::take_buffers).
    ///
    /// # Errors
    ///
    /// The buffers come back with the error:
    /// - `ConfigError::AlreadyBusy` while a transfer is running or an error
    ///   is waiting to be reported
    /// - `ConfigError::BuffersInUse` if the previous transfer's buffers were
    ///   not taken back
    /// - `ConfigError::MisalignedBuffer` for misaligned buffers
    pub fn start(&mut self, buffers: FeedBuffers) -> Result<(), (ConfigError, FeedBuffers)> {
        if self.is_busy() || self.dma_error.load(Ordering::Acquire) {
            return Err((ConfigError::AlreadyBusy, buffers));
        }
        self.policy.load(buffers)?;
        self.launch();
        Ok(())
    }

    /// Hand the buffers of a finished, failed or aborted transfer back.
    ///
    /// Returns `None` while the hardware may still touch them (a transfer is
    /// running or an error has not been recovered by [`poll`](Self::poll)
    /// yet), or if no buffers are held.
    pub fn take_buffers(&mut self) -> Option<FeedBuffers> {
        if self.is_busy() || self.dma_error.load(Ordering::Acquire) {
            return None;
        }
        self.policy.release()
    }
}

impl<'a, D, I, P, W> FeedEngine<'a, D, I, P, W>
where
    D: DmaController,
    I: InterruptController,
    P: FeedPolicy,
    W: DelayNs,
{
    /// Create an engine with a custom delay between reset polls
    pub fn with_delay(
        config: FeedConfig,
        dma: D,
        intc: I,
        policy: P,
        tx_region: &'a [BufferDescriptor],
        rx_region: &'a [BufferDescriptor],
        delay: W,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let mut engine = Self {
            config,
            dma,
            tx_ring: DescriptorRing::new(tx_region),
            rx_ring: DescriptorRing::new(rx_region),
            binding: InterruptBinding::new(intc, config),
            policy,
            reset: ResetController::new(delay, config.reset),
            rings_up: false,
            busy: false,
            done: AtomicBool::new(false),
            dma_error: AtomicBool::new(false),
            fault: None,
        };
        engine.acquire_rings()?;
        Ok(engine)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Engine configuration
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The feed policy
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The feed policy, for loading a new session while idle
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// The DMA device
    pub fn dma(&self) -> &D {
        &self.dma
    }

    /// Transmit ring
    pub fn tx_ring(&self) -> &DescriptorRing<'a, D::Channel> {
        &self.tx_ring
    }

    /// Receive ring
    pub fn rx_ring(&self) -> &DescriptorRing<'a, D::Channel> {
        &self.rx_ring
    }

    /// Interrupt wiring
    pub fn binding(&self) -> &InterruptBinding<I> {
        &self.binding
    }

    /// Check if both rings are configured
    pub fn rings_up(&self) -> bool {
        self.rings_up
    }

    /// Check if a transfer is running (not yet complete or failed)
    pub fn is_busy(&self) -> bool {
        self.busy && !self.done.load(Ordering::Acquire)
    }

    /// The hardware error behind the latest [`FeedState::IdleError`].
    ///
    /// Kept until the next transfer starts.
    pub fn last_error(&self) -> Option<TransferError> {
        self.fault
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a transfer with whatever session the policy holds.
    ///
    /// Re-acquires the rings if a reset invalidated them, arms interrupts,
    /// primes both rings and starts both channels. A session with nothing to
    /// move completes immediately.
    ///
    /// # Errors
    ///
    /// `ConfigError::AlreadyBusy` while a transfer is running or an error is
    /// waiting to be reported by [`poll`](Self::poll).
    ///
    /// # Panics
    ///
    /// Configuration faults found here (ring re-acquisition, interrupt
    /// wiring, channel start) stop the program.
    pub fn start_transfer(&mut self) -> ConfigResult<()> {
        if self.is_busy() || self.dma_error.load(Ordering::Acquire) {
            return Err(ConfigError::AlreadyBusy);
        }
        self.launch();
        Ok(())
    }

    /// Arm, prime and start both channels for the loaded session.
    fn launch(&mut self) {
        self.fault = None;
        self.done.store(false, Ordering::Release);
        self.dma_error.store(false, Ordering::Release);

        if let Err(err) = self.acquire_rings() {
            fatal(err);
        }
        if let Err(err) = self
            .binding
            .set_interrupts(true, &mut self.tx_ring, &mut self.rx_ring)
        {
            fatal(err);
        }

        self.busy = true;
        self.policy
            .queue(&mut self.tx_ring, &mut self.rx_ring, true, true);
        if self.policy.is_complete() {
            self.finish();
        }

        if let Err(err) = self.tx_ring.start() {
            fatal(err);
        }
        if let Err(err) = self.rx_ring.start() {
            fatal(err);
        }

        #[cfg(feature = "log")]
        debug!(
            "transfer started: tx {} bytes, rx {} bytes",
            self.policy.remaining(Direction::Tx),
            self.policy.remaining(Direction::Rx)
        );
    }

    /// Report the engine state, running error recovery if needed.
    ///
    /// A hardware error is reported as [`FeedState::IdleError`] exactly once;
    /// the DMA device has been reset by the time it is returned.
    ///
    /// # Panics
    ///
    /// Stops the program if the DMA reset never completes.
    pub fn poll(&mut self) -> FeedState {
        if self.dma_error.load(Ordering::Acquire) {
            self.busy = false;
            self.dma_error.store(false, Ordering::Release);
            self.recover();

            #[cfg(feature = "log")]
            if let Some(fault) = self.fault {
                warn!("transfer failed: {fault}");
            }
            return FeedState::IdleError;
        }

        if self.busy && self.done.load(Ordering::Acquire) {
            self.busy = false;
        }
        if self.busy {
            FeedState::Busy
        } else {
            FeedState::Idle
        }
    }

    /// Abandon a running transfer.
    ///
    /// Runs the same reset as error recovery; the next [`poll`](Self::poll)
    /// reports [`FeedState::Idle`]. Does nothing when idle.
    pub fn abort(&mut self) {
        if !self.busy {
            return;
        }

        // Completed but not yet polled: nothing left on the hardware
        let running = self.is_busy() || self.dma_error.load(Ordering::Acquire);
        self.busy = false;
        self.dma_error.store(false, Ordering::Release);
        self.done.store(true, Ordering::Release);
        if running {
            #[cfg(feature = "log")]
            debug!("transfer aborted");

            self.recover();
        }
    }

    // =========================================================================
    // Interrupt Handling
    // =========================================================================

    /// Service the interrupt line of one direction.
    ///
    /// Call from the platform handler routed to `direction`.
    pub fn handle_interrupt(&mut self, direction: Direction) {
        let status = IrqStatus::from_raw(self.ring_mut(direction).take_irq(irq::ALL));

        if !status.any() {
            return;
        }
        // Trailing delay interrupt after completion, or a stray one while idle
        if !self.busy || self.done.load(Ordering::Acquire) {
            return;
        }
        if status.has_error() {
            #[cfg(feature = "log")]
            warn!("{} channel error interrupt", direction.as_str());
            #[cfg(feature = "defmt")]
            defmt::warn!("{} channel error interrupt", direction.as_str());

            self.latch(TransferError::IrqError);
        }
        if self.dma_error.load(Ordering::Acquire) {
            return;
        }
        if !status.has_completion() {
            return;
        }

        let ring = match direction {
            Direction::Tx => &mut self.tx_ring,
            Direction::Rx => &mut self.rx_ring,
        };
        if let Err(err) = self.policy.collect(direction, ring) {
            self.latch(err);
            return;
        }
        if self.policy.is_complete() {
            self.finish();
            return;
        }

        let tx_ready = direction == Direction::Tx;
        self.policy
            .queue(&mut self.tx_ring, &mut self.rx_ring, tx_ready, !tx_ready);
    }

    /// Service the transmit (MM2S) interrupt line
    pub fn on_tx_interrupt(&mut self) {
        self.handle_interrupt(Direction::Tx);
    }

    /// Service the receive (S2MM) interrupt line
    pub fn on_rx_interrupt(&mut self) {
        self.handle_interrupt(Direction::Rx);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Configure both rings against the DMA device. Does nothing if they are
    /// already configured.
    fn acquire_rings(&mut self) -> ConfigResult<()> {
        if self.rings_up {
            return Ok(());
        }

        if !self.dma.locate(self.config.device_id) {
            return Err(ConfigError::DeviceNotFound);
        }
        self.dma.initialize()?;
        if !self.dma.has_scatter_gather() {
            return Err(ConfigError::NoScatterGather);
        }

        let (tx, rx) = self.dma.channels();
        self.tx_ring.attach(tx);
        self.rx_ring.attach(rx);

        // Channel interrupts must be off while the rings are built
        self.binding
            .set_dma_side(false, &mut self.tx_ring, &mut self.rx_ring)?;

        self.tx_ring.create()?;
        self.rx_ring.create()?;
        self.rings_up = true;
        Ok(())
    }

    fn ring_mut(&mut self, direction: Direction) -> &mut DescriptorRing<'a, D::Channel> {
        match direction {
            Direction::Tx => &mut self.tx_ring,
            Direction::Rx => &mut self.rx_ring,
        }
    }

    /// Record a hardware error; the first one of a transfer is kept.
    fn latch(&mut self, err: TransferError) {
        if !self.dma_error.load(Ordering::Acquire) {
            self.fault = Some(err);
        }
        self.dma_error.store(true, Ordering::Release);
    }

    /// Both directions are complete.
    fn finish(&mut self) {
        if self.tx_ring.has_undrained_completions() || self.rx_ring.has_undrained_completions() {
            fatal("transfer completed with uncollected descriptors");
        }
        self.done.store(true, Ordering::Release);

        #[cfg(feature = "log")]
        debug!("transfer complete");
    }

    /// Reset the DMA device and drop all ring state.
    fn recover(&mut self) {
        self.tx_ring.disable_interrupts(irq::ALL);
        self.rx_ring.disable_interrupts(irq::ALL);
        // Reset leaves channel interrupts disabled
        self.binding.mark_dma_side_down();

        // Submitted descriptors are discarded by the reset
        self.tx_ring.invalidate();
        self.rx_ring.invalidate();
        self.rings_up = false;

        match self.reset.reset(&mut self.dma) {
            Ok(_attempt) => {
                #[cfg(feature = "log")]
                warn!("DMA reset after error (attempt {_attempt})");
            }
            Err(err) => fatal(err),
        }
    }
}

impl<D, I, P, W> Drop for FeedEngine<'_, D, I, P, W>
where
    D: DmaController,
    I: InterruptController,
    P: FeedPolicy,
    W: DelayNs,
{
    fn drop(&mut self) {
        // Stop the hardware before the policy lets go of the session buffers
        if self.is_busy() || self.dma_error.load(Ordering::Acquire) {
            self.busy = false;
            self.dma_error.store(false, Ordering::Release);
            self.recover();
        }
        let _ = self
            .binding
            .set_interrupts(false, &mut self.tx_ring, &mut self.rx_ring);
    }
}

// =============================================================================
// Tests
// =============================================================================
