//! Platform interrupt controller capability
//!
//! The controller is process-scoped: one instance serves every feed engine in
//! the application, so engines borrow it (`&mut T` implements the trait)
//! instead of owning a hidden global.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::driver::config::Direction;
use crate::error::ConfigResult;

/// Interrupt line trigger mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Rising edge (DMA interrupt outputs are pulses)
    RisingEdge,
    /// Active-high level
    LevelHigh,
}

/// Platform interrupt controller.
///
/// `connect` routes a line to the feed engine handler for one direction; the
/// platform glue calls [`FeedEngine::handle_interrupt`] with that direction
/// when the line fires.
///
/// [`FeedEngine::handle_interrupt`]: crate::FeedEngine::handle_interrupt
pub trait InterruptController {
    /// Program priority and trigger mode of one line
    fn set_priority_trigger(&mut self, irq: u32, priority: u8, trigger: Trigger);

    /// Route `irq` to the handler for `route`
    fn connect(&mut self, irq: u32, route: Direction) -> ConfigResult<()>;

    /// Remove the handler from `irq`
    fn disconnect(&mut self, irq: u32);

    /// Unmask one line
    fn enable(&mut self, irq: u32);

    /// Mask one line
    fn disable(&mut self, irq: u32);

    /// Register the controller's dispatcher as the CPU interrupt exception handler
    fn install_exception_handler(&mut self);

    /// Enable CPU interrupt exceptions
    fn enable_exceptions(&mut self);
}

impl<T: InterruptController + ?Sized> InterruptController for &mut T {
    fn set_priority_trigger(&mut self, irq: u32, priority: u8, trigger: Trigger) {
        (**self).set_priority_trigger(irq, priority, trigger);
    }

    fn connect(&mut self, irq: u32, route: Direction) -> ConfigResult<()> {
        (**self).connect(irq, route)
    }

    fn disconnect(&mut self, irq: u32) {
        (**self).disconnect(irq);
    }

    fn enable(&mut self, irq: u32) {
        (**self).enable(irq);
    }

    fn disable(&mut self, irq: u32) {
        (**self).disable(irq);
    }

    fn install_exception_handler(&mut self) {
        (**self).install_exception_handler();
    }

    fn enable_exceptions(&mut self) {
        (**self).enable_exceptions();
    }
}

static EXCEPTIONS_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the controller dispatcher as the CPU exception handler and enable
/// exceptions.
///
/// Call once per application before starting any feed engine. Later calls do
/// nothing and return `false`.
pub fn install_global_interrupt_handling<I: InterruptController>(intc: &mut I) -> bool {
    if EXCEPTIONS_INSTALLED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return false;
    }
    intc.install_exception_handler();
    intc.enable_exceptions();
    true
}

// =============================================================================
// Tests
// =============================================================================
