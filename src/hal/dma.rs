//! DMA engine capability traits
//!
//! The feed engine never touches registers itself. A platform crate
//! implements [`DmaController`] for its DMA device and [`DmaChannel`] for the
//! two channel register blocks (MM2S and S2MM).

use crate::driver::config::Coalescing;
use crate::error::ConfigResult;

/// One direction of a scatter-gather DMA device.
///
/// Descriptor addresses are passed as plain addresses; the descriptor memory
/// is owned by the ring, the channel only programs pointers.
pub trait DmaChannel {
    /// Check whether the channel run/stop bit is set and the channel is not halted
    fn is_running(&self) -> bool;

    /// Program the current-descriptor pointer (only valid while halted)
    fn set_current_descriptor(&mut self, addr: usize);

    /// Set the run/stop bit
    fn run(&mut self);

    /// Program the tail-descriptor pointer, handing descriptors up to and
    /// including `addr` to the hardware
    fn set_tail_descriptor(&mut self, addr: usize);

    /// Program interrupt coalescing; `None` fields keep the hardware value
    fn set_coalescing(&mut self, coalescing: Coalescing) -> ConfigResult<()>;

    /// Enable the interrupt sources in `mask`
    fn enable_interrupts(&mut self, mask: u32);

    /// Disable the interrupt sources in `mask`
    fn disable_interrupts(&mut self, mask: u32);

    /// Pending interrupt status bits
    fn irq_status(&self) -> u32;

    /// Acknowledge (write-one-to-clear) the interrupt bits in `mask`
    fn ack_irq(&mut self, mask: u32);
}

/// A scatter-gather DMA device with one transmit and one receive channel.
pub trait DmaController {
    /// Channel handle type
    type Channel: DmaChannel;

    /// Look up the device configuration for `device_id`
    ///
    /// Returns `false` if no such device exists.
    fn locate(&mut self, device_id: u32) -> bool;

    /// Initialize the driver instance from the located configuration
    fn initialize(&mut self) -> ConfigResult<()>;

    /// Check whether the device was built in scatter-gather mode
    fn has_scatter_gather(&self) -> bool;

    /// Handles for the transmit (MM2S) and receive (S2MM) channels
    fn channels(&mut self) -> (Self::Channel, Self::Channel);

    /// Start a soft reset of both channels
    ///
    /// Reset halts both channels and disables all of their interrupts.
    fn reset(&mut self);

    /// Check whether the last reset has finished
    fn reset_is_done(&self) -> bool;
}
