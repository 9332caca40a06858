//! Testing utilities and mock implementations
//!
//! Host-side stand-ins for the DMA device, its channels and the platform
//! interrupt controller, plus helpers that play the hardware's part on a
//! descriptor ring.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, Ref, RefCell, RefMut};
use std::boxed::Box;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::format;
use std::rc::Rc;
use std::string::String;
use std::vec;
use std::vec::Vec;

use crate::dma::DescriptorRing;
use crate::driver::config::{Coalescing, Direction};
use crate::error::{ConfigError, ConfigResult};
use crate::hal::{DmaChannel, DmaController, InterruptController, Trigger};

// =============================================================================
// Call Log
// =============================================================================

/// Ordered record of hardware calls, shared by every mock it is handed to.
///
/// Entries read `"<device>.<call>"`, e.g. `"tx.run"` or `"intc.connect"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, device: &str, call: &str) {
        self.0.borrow_mut().push(format!("{device}.{call}"));
    }

    /// Take every entry recorded so far
    pub fn drain(&self) -> Vec<String> {
        core::mem::take(&mut *self.0.borrow_mut())
    }
}

// =============================================================================
// Mock DMA Channel
// =============================================================================

/// Register-level state of one mock channel
#[derive(Debug, Default)]
pub struct ChannelState {
    pub running: bool,
    pub runs: usize,
    pub current: Option<usize>,
    pub tail: Option<usize>,
    pub tail_writes: usize,
    pub coalescing: Option<Coalescing>,
    pub coalescing_writes: usize,
    pub enabled: u32,
    pub pending: u32,
    pub disable_calls: usize,
}

/// Mock DMA channel
///
/// Clones share state, so a test can keep a handle to a channel after the
/// device has handed it to a ring.
#[derive(Debug, Clone, Default)]
pub struct MockChannel {
    state: Rc<RefCell<ChannelState>>,
    log: Option<(&'static str, CallLog)>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel recording its register writes into `log` under `name`
    pub fn logged(name: &'static str, log: &CallLog) -> Self {
        Self {
            state: Rc::default(),
            log: Some((name, log.clone())),
        }
    }

    fn record(&self, call: &str) {
        if let Some((name, log)) = &self.log {
            log.record(name, call);
        }
    }

    pub fn state(&self) -> Ref<'_, ChannelState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, ChannelState> {
        self.state.borrow_mut()
    }

    /// Latch interrupt status bits as hardware would
    pub fn raise(&self, bits: u32) {
        self.state.borrow_mut().pending |= bits;
    }

    fn halt(&self) {
        let mut state = self.state.borrow_mut();
        state.running = false;
        state.current = None;
        state.tail = None;
        state.enabled = 0;
        state.pending = 0;
    }
}

impl DmaChannel for MockChannel {
    fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    fn set_current_descriptor(&mut self, addr: usize) {
        self.record("current");
        self.state.borrow_mut().current = Some(addr);
    }

    fn run(&mut self) {
        self.record("run");
        let mut state = self.state.borrow_mut();
        state.running = true;
        state.runs += 1;
    }

    fn set_tail_descriptor(&mut self, addr: usize) {
        self.record("tail");
        let mut state = self.state.borrow_mut();
        state.tail = Some(addr);
        state.tail_writes += 1;
    }

    fn set_coalescing(&mut self, coalescing: Coalescing) -> ConfigResult<()> {
        self.record("coalescing");
        let mut state = self.state.borrow_mut();
        state.coalescing = Some(coalescing);
        state.coalescing_writes += 1;
        Ok(())
    }

    fn enable_interrupts(&mut self, mask: u32) {
        self.record("enable");
        self.state.borrow_mut().enabled |= mask;
    }

    fn disable_interrupts(&mut self, mask: u32) {
        self.record("disable");
        let mut state = self.state.borrow_mut();
        state.enabled &= !mask;
        state.disable_calls += 1;
    }

    fn irq_status(&self) -> u32 {
        self.state.borrow().pending
    }

    fn ack_irq(&mut self, mask: u32) {
        self.state.borrow_mut().pending &= !mask;
    }
}

// =============================================================================
// Mock DMA Device
// =============================================================================

/// Mock DMA device with a configurable reset outcome
#[derive(Debug)]
pub struct MockDma {
    /// `locate` result
    pub found: bool,
    /// `has_scatter_gather` result
    pub scatter_gather: bool,
    /// Number of `initialize` calls
    pub initializations: usize,
    tx: MockChannel,
    rx: MockChannel,
    resets: u32,
    reset_polls: Cell<u32>,
    failing_resets: u32,
    reset_stuck: bool,
    log: Option<CallLog>,
}

impl MockDma {
    pub fn new() -> Self {
        Self::with_channels(MockChannel::new(), MockChannel::new(), None)
    }

    /// Device whose resets and channel writes land in `log`
    pub fn logged(log: &CallLog) -> Self {
        Self::with_channels(
            MockChannel::logged("tx", log),
            MockChannel::logged("rx", log),
            Some(log.clone()),
        )
    }

    fn with_channels(tx: MockChannel, rx: MockChannel, log: Option<CallLog>) -> Self {
        Self {
            found: true,
            scatter_gather: true,
            initializations: 0,
            tx,
            rx,
            resets: 0,
            reset_polls: Cell::new(0),
            failing_resets: 0,
            reset_stuck: false,
            log,
        }
    }

    /// Make the next `n` resets never report done
    pub fn fail_resets(&mut self, n: u32) {
        self.failing_resets = n;
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn reset_polls(&self) -> u32 {
        self.reset_polls.get()
    }

    pub fn tx(&self) -> &MockChannel {
        &self.tx
    }

    pub fn rx(&self) -> &MockChannel {
        &self.rx
    }
}

impl Default for MockDma {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaController for MockDma {
    type Channel = MockChannel;

    fn locate(&mut self, _device_id: u32) -> bool {
        self.found
    }

    fn initialize(&mut self) -> ConfigResult<()> {
        self.initializations += 1;
        Ok(())
    }

    fn has_scatter_gather(&self) -> bool {
        self.scatter_gather
    }

    fn channels(&mut self) -> (MockChannel, MockChannel) {
        (self.tx.clone(), self.rx.clone())
    }

    fn reset(&mut self) {
        if let Some(log) = &self.log {
            log.record("dma", "reset");
        }
        self.resets += 1;
        self.tx.halt();
        self.rx.halt();
        self.reset_stuck = self.failing_resets > 0;
        self.failing_resets = self.failing_resets.saturating_sub(1);
    }

    fn reset_is_done(&self) -> bool {
        self.reset_polls.set(self.reset_polls.get() + 1);
        !self.reset_stuck
    }
}

// =============================================================================
// Mock Interrupt Controller
// =============================================================================

/// Mock platform interrupt controller
#[derive(Debug, Default)]
pub struct MockIntc {
    routes: BTreeMap<u32, Direction>,
    enabled: BTreeSet<u32>,
    priorities: BTreeMap<u32, (u8, Trigger)>,
    /// Make every `connect` fail
    pub fail_connect: bool,
    pub connects: usize,
    pub disconnects: usize,
    pub exception_handler_installs: usize,
    pub exception_enables: usize,
    log: Option<CallLog>,
}

impl MockIntc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller recording its calls into `log`
    pub fn logged(log: &CallLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::default()
        }
    }

    fn record(&self, call: &str) {
        if let Some(log) = &self.log {
            log.record("intc", call);
        }
    }

    pub fn route(&self, irq: u32) -> Option<Direction> {
        self.routes.get(&irq).copied()
    }

    pub fn is_enabled(&self, irq: u32) -> bool {
        self.enabled.contains(&irq)
    }

    pub fn priority(&self, irq: u32) -> Option<(u8, Trigger)> {
        self.priorities.get(&irq).copied()
    }
}

impl InterruptController for MockIntc {
    fn set_priority_trigger(&mut self, irq: u32, priority: u8, trigger: Trigger) {
        self.record("priority");
        self.priorities.insert(irq, (priority, trigger));
    }

    fn connect(&mut self, irq: u32, route: Direction) -> ConfigResult<()> {
        self.record("connect");
        if self.fail_connect {
            return Err(ConfigError::ConnectFailed);
        }
        self.routes.insert(irq, route);
        self.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self, irq: u32) {
        self.record("disconnect");
        self.routes.remove(&irq);
        self.disconnects += 1;
    }

    fn enable(&mut self, irq: u32) {
        self.record("enable");
        self.enabled.insert(irq);
    }

    fn disable(&mut self, irq: u32) {
        self.record("disable");
        self.enabled.remove(&irq);
    }

    fn install_exception_handler(&mut self) {
        self.exception_handler_installs += 1;
    }

    fn enable_exceptions(&mut self) {
        self.exception_enables += 1;
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: RefCell<u64>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        *self.total_ns.borrow()
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += ns as u64;
    }
}

impl embedded_hal::delay::DelayNs for &MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += ns as u64;
    }
}

// =============================================================================
// Buffers and Randomness
// =============================================================================

/// Zeroed `len`-byte buffer on a DMA-legal (4-byte) boundary, leaked for
/// the rest of the test run
pub fn static_buffer(len: usize) -> &'static mut [u8] {
    let words: &'static mut [u32] = Box::leak(vec![0u32; len.div_ceil(4)].into_boxed_slice());
    // SAFETY: the allocation holds at least `len` initialized bytes and is
    // never freed
    unsafe { core::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<u8>(), len) }
}

/// Small deterministic generator for property tests
#[derive(Debug, Clone)]
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform-ish value in `0..n`
    pub fn below(&mut self, n: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) as usize) % n
    }
}

// =============================================================================
// Simulated Hardware
// =============================================================================

/// Complete up to `n` in-flight descriptors that hardware has not finished
/// yet, each with its full requested length. Returns how many were completed.
pub fn complete_in_flight<C: DmaChannel>(ring: &DescriptorRing<'_, C>, n: usize) -> usize {
    let mut done = 0;
    for index in ring.in_flight_span().indices() {
        if done == n {
            break;
        }
        let bd = ring.descriptor(index);
        if bd.is_complete() {
            continue;
        }
        bd.write_back(bd.requested_length(), 0);
        done += 1;
    }
    done
}

/// Complete the next unfinished in-flight descriptor with error status bits
pub fn fail_in_flight<C: DmaChannel>(ring: &DescriptorRing<'_, C>, error_bits: u32) {
    if let Some(bd) = ring
        .in_flight_span()
        .indices()
        .map(|index| ring.descriptor(index))
        .find(|bd| !bd.is_complete())
    {
        bd.write_back(0, error_bits);
    }
}

/// Stream loopback between a Tx and an Rx ring.
///
/// Tx descriptors are consumed into a FIFO; Rx descriptors complete once the
/// FIFO holds their full requested length.
#[derive(Debug, Default)]
pub struct Loopback {
    fifo: VecDeque<u8>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pump<C: DmaChannel>(&mut self, tx: &DescriptorRing<'_, C>, rx: &DescriptorRing<'_, C>) {
        for index in tx.in_flight_span().indices() {
            let bd = tx.descriptor(index);
            if bd.is_complete() {
                continue;
            }
            let len = bd.requested_length();
            // SAFETY: the descriptor points into a live buffer lent to the engine
            let data =
                unsafe { core::slice::from_raw_parts(bd.buffer_addr() as usize as *const u8, len) };
            self.fifo.extend(data.iter().copied());
            bd.write_back(len, 0);
        }

        for index in rx.in_flight_span().indices() {
            let bd = rx.descriptor(index);
            if bd.is_complete() {
                continue;
            }
            let len = bd.requested_length();
            if self.fifo.len() < len {
                break;
            }
            // SAFETY: the descriptor points into a live buffer lent to the engine
            let data = unsafe {
                core::slice::from_raw_parts_mut(bd.buffer_addr() as usize as *mut u8, len)
            };
            for byte in data.iter_mut() {
                *byte = self.fifo.pop_front().unwrap_or_default();
            }
            bd.write_back(len, 0);
        }
    }
}
