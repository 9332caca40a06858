//! Hardware Abstraction Layer
//!
//! Narrow capability traits for the collaborators the feed engine drives but
//! does not implement: the DMA device and the platform interrupt controller.
//!
//! # Modules
//!
//! - [`dma`]: DMA device and channel traits
//! - [`intc`]: Interrupt controller trait and one-time exception setup
//! - [`reset`]: Bounded-retry DMA reset
//!
//! # Delay Integration
//!
//! The reset poll loop takes any `embedded_hal::delay::DelayNs`. The default
//! [`NoDelay`] spins without pausing.

pub mod dma;
pub mod intc;
pub mod reset;

// Re-export commonly used types
pub use dma::{DmaChannel, DmaController};
pub use intc::{InterruptController, Trigger, install_global_interrupt_handling};
pub use reset::{NoDelay, ResetController};
