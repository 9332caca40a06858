//! Interrupt binding between the DMA channels and the platform controller.
//!
//! Two independent sides are tracked:
//!
//! - **DMA side**: the channels' own interrupt generation (coalescing plus
//!   the IOC, delay and error sources)
//! - **Controller side**: priority, routing and masking of the two lines in
//!   the platform interrupt controller
//!
//! Both setters compare against the believed state and do nothing when it
//! already matches.

use crate::dma::DescriptorRing;
use crate::dma::descriptor::bits::irq;
use crate::driver::config::{Direction, FeedConfig};
use crate::error::ConfigResult;
use crate::hal::{DmaChannel, InterruptController, Trigger};

/// Interrupt wiring for one feed engine
#[derive(Debug)]
pub struct InterruptBinding<I: InterruptController> {
    intc: I,
    config: FeedConfig,
    dma_side_up: bool,
    controller_side_up: bool,
}

impl<I: InterruptController> InterruptBinding<I> {
    /// Create a binding.
    ///
    /// The DMA side starts believed up, so the first ring acquisition issues
    /// an explicit disable before the rings are configured.
    pub fn new(intc: I, config: FeedConfig) -> Self {
        Self {
            intc,
            config,
            dma_side_up: true,
            controller_side_up: false,
        }
    }

    /// Believed state of the DMA side
    #[inline(always)]
    pub fn dma_side_up(&self) -> bool {
        self.dma_side_up
    }

    /// Believed state of the controller side
    #[inline(always)]
    pub fn controller_side_up(&self) -> bool {
        self.controller_side_up
    }

    /// Borrow the interrupt controller
    pub fn controller(&self) -> &I {
        &self.intc
    }

    /// Record that a DMA reset has already disabled the channel interrupts
    pub fn mark_dma_side_down(&mut self) {
        self.dma_side_up = false;
    }

    /// Enable or disable interrupt generation on both channels.
    ///
    /// Enabling programs coalescing on both rings first, then unmasks the
    /// IOC, delay and error sources.
    pub fn set_dma_side<C: DmaChannel>(
        &mut self,
        up: bool,
        tx: &mut DescriptorRing<'_, C>,
        rx: &mut DescriptorRing<'_, C>,
    ) -> ConfigResult<()> {
        if up == self.dma_side_up {
            return Ok(());
        }
        if up {
            tx.set_coalescing(self.config.coalescing(Direction::Tx))?;
            rx.set_coalescing(self.config.coalescing(Direction::Rx))?;
            tx.enable_interrupts(irq::ALL);
            rx.enable_interrupts(irq::ALL);
        } else {
            tx.disable_interrupts(irq::ALL);
            rx.disable_interrupts(irq::ALL);
        }
        self.dma_side_up = up;
        Ok(())
    }

    /// Connect or disconnect both lines at the interrupt controller.
    ///
    /// DMA interrupt outputs are pulses, so lines are programmed for a
    /// rising edge and must be live before the channels start.
    pub fn set_controller_side(&mut self, up: bool) -> ConfigResult<()> {
        if up == self.controller_side_up {
            return Ok(());
        }
        if up {
            for direction in Direction::BOTH {
                self.intc.set_priority_trigger(
                    self.config.irq(direction),
                    self.config.irq_priority,
                    Trigger::RisingEdge,
                );
            }
            for direction in Direction::BOTH {
                self.intc.connect(self.config.irq(direction), direction)?;
            }
            for direction in Direction::BOTH {
                self.intc.enable(self.config.irq(direction));
            }
        } else {
            for direction in Direction::BOTH {
                let line = self.config.irq(direction);
                self.intc.disable(line);
                self.intc.disconnect(line);
            }
        }
        self.controller_side_up = up;
        Ok(())
    }

    /// Bring both sides up (DMA side first) or down (controller side first)
    pub fn set_interrupts<C: DmaChannel>(
        &mut self,
        up: bool,
        tx: &mut DescriptorRing<'_, C>,
        rx: &mut DescriptorRing<'_, C>,
    ) -> ConfigResult<()> {
        if up {
            self.set_dma_side(true, tx, rx)?;
            self.set_controller_side(true)
        } else {
            self.set_controller_side(false)?;
            self.set_dma_side(false, tx, rx)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
