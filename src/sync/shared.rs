//! ISR-safe feed engine wrapper using critical sections.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;

use crate::driver::config::Direction;
use crate::driver::engine::FeedEngine;
use crate::driver::state::FeedState;
use crate::hal::{DmaController, InterruptController};
use crate::policy::FeedPolicy;

/// Slot holding a feed engine shared between the main loop and the
/// interrupt handlers.
///
/// The slot starts empty so it can live in a `static`; the engine is built
/// at run time and moved in with [`install`](Self::install). All access goes
/// through `critical_section::with()`, disabling interrupts for the duration
/// of the closure.
///
/// # Interrupt handlers
///
/// [`on_interrupt`](Self::on_interrupt) enters a critical section from
/// inside the handler. On a single-core part the critical section only masks
/// interrupts: it is never contended while the handler runs, because the
/// main loop cannot hold it at that point. On multi-core parts the critical
/// section is a real lock; there, keep the engine out of this slot and call
/// [`FeedEngine::handle_interrupt`] from a handler that owns it exclusively.
///
/// # Example
///
/// ```ignore
/// static FEED: SharedFeed<FeedEngine<'static, AxiDma, &'static mut Gic>> = SharedFeed::new();
///
/// FEED.install(FeedEngine::contiguous(config, dma, intc, tx_bds, rx_bds)?);
/// FEED.with(|feed| feed.start(FeedBuffers::new(TX_DATA, rx_buf)));
/// while FEED.poll() == Some(FeedState::Busy) {}
/// let buffers = FEED.with(FeedEngine::take_buffers);
///
/// fn mm2s_irq() {
///     FEED.on_interrupt(Direction::Tx);
/// }
/// ```
pub struct SharedFeed<E> {
    slot: Mutex<RefCell<Option<E>>>,
}

impl<E> SharedFeed<E> {
    /// Create an empty slot (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
        }
    }

    /// Move an engine into the slot, returning the previous one
    pub fn install(&self, engine: E) -> Option<E> {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).replace(engine))
    }

    /// Move the engine out of the slot
    pub fn take(&self) -> Option<E> {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).take())
    }

    /// Check if an engine is installed
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow_ref(cs).is_some())
    }

    /// Execute a closure with exclusive access to the engine.
    ///
    /// Returns `None` if no engine is installed.
    ///
    /// # Panics
    ///
    /// Panics if called again from inside the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut E) -> R,
    {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Like [`with`](Self::with), but returns `None` instead of panicking if
    /// the engine is already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut E) -> R,
    {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow(cs).try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }
}

impl<E> Default for SharedFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, D, I, P, W> SharedFeed<FeedEngine<'a, D, I, P, W>>
where
    D: DmaController,
    I: InterruptController,
    P: FeedPolicy,
    W: DelayNs,
{
    /// Service one interrupt line. Returns `false` if no engine is installed.
    pub fn on_interrupt(&self, direction: Direction) -> bool {
        self.with(|engine| engine.handle_interrupt(direction)).is_some()
    }

    /// Poll the installed engine
    pub fn poll(&self) -> Option<FeedState> {
        self.with(FeedEngine::poll)
    }
}
