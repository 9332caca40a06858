//! Core driver components of the feed engine.
//!
//! - [`config`] - Configuration types and builder methods
//! - [`binding`] - Interrupt wiring between the DMA channels and the
//!   platform interrupt controller
//! - [`engine`] - The feed engine itself
//! - [`interrupt`] - Channel interrupt status decoding
//! - [`state`] - Lifecycle state reported by `poll`
//!
//! # Example
//!
//! ```ignore
//! use sg_dma_feed::driver::{Coalescing, FeedConfig, FeedEngine};
//!
//! let config = FeedConfig::new(DMA_DEVICE_ID, MM2S_IRQ, S2MM_IRQ)
//!     .with_rx_coalescing(Coalescing::new(8, 16));
//! ```

// Submodules
pub mod binding;
pub mod config;
pub mod engine;
pub mod interrupt;
pub mod state;

// Re-exports for convenience
pub use binding::InterruptBinding;
pub use config::{Coalescing, Direction, FeedConfig, ResetPolicy};
pub use engine::FeedEngine;
pub use interrupt::IrqStatus;
pub use state::FeedState;
