//! Scatter-Gather DMA Feed Engine
//!
//! A `no_std`, `no_alloc` engine that keeps a bidirectional scatter-gather DMA
//! channel fed from a pair of descriptor rings.
//!
//! The engine moves one outbound buffer to the stream (Tx, MM2S) and fills one
//! inbound buffer from the stream (Rx, S2MM) at the same time. Buffers are cut
//! into descriptors of at most `max_payload` bytes; descriptors are refilled
//! from interrupt context as hardware retires them, so a buffer larger than
//! the ring streams through it in bursts.
//!
//! # Architecture
//!
//! 1. **Descriptor Layer** ([`dma`]): hardware descriptor layout and the
//!    four-group descriptor ring
//! 2. **Policy Layer** ([`policy`]): how buffers are cut into descriptors
//!    ([`FeedPolicy`], [`ContiguousFeed`])
//! 3. **Driver Layer** ([`driver`]): [`FeedEngine`] lifecycle, interrupt
//!    binding and error recovery
//! 4. **HAL Layer** ([`hal`]): traits for the DMA device, the platform
//!    interrupt controller, and the reset protocol
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --start()--> Busy --both directions complete--> Idle
//!                    |
//!                    +--hardware error--> (reset on poll) --> IdleError --> Idle
//! ```
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting for public types and defmt diagnostics
//! - `log`: Emit diagnostics through the `log` facade
//! - `critical-section`: Enable the ISR-safe [`SharedFeed`](sync::SharedFeed) wrapper
//!
//! # Example
//!
//! ```ignore
//! use sg_dma_feed::{DefaultRingStorage, FeedBuffers, FeedConfig, FeedEngine, FeedState};
//!
//! static TX_BDS: DefaultRingStorage = DefaultRingStorage::new();
//! static RX_BDS: DefaultRingStorage = DefaultRingStorage::new();
//!
//! sg_dma_feed::install_global_interrupt_handling(&mut gic);
//!
//! let config = FeedConfig::new(DMA_DEVICE_ID, MM2S_IRQ, S2MM_IRQ).with_max_payload(4096);
//! let mut feed = FeedEngine::contiguous(config, dma, &mut gic, TX_BDS.as_slice(), RX_BDS.as_slice())?;
//!
//! // Buffers are `&'static`, e.g. from a `static_cell::StaticCell`
//! feed.start(FeedBuffers::new(tx_data, rx_data)).map_err(|(err, _)| err)?;
//! loop {
//!     match feed.poll() {
//!         FeedState::Busy => continue,
//!         FeedState::Idle => break,
//!         FeedState::IdleError => { /* DMA was reset, see feed.last_error() */ break }
//!     }
//! }
//! let FeedBuffers { tx, rx } = feed.take_buffers().unwrap();
//! ```
//!
//! The engine holds the payload buffers from `start` until the transfer is
//! over and hands them back through `take_buffers`. Dropping an engine in
//! the middle of a transfer resets the DMA device first.
//!
//! The platform interrupt handlers routed by the controller call
//! [`FeedEngine::handle_interrupt`] with their direction.
//!
//! # Memory Requirements
//!
//! Each descriptor takes 64 bytes. The default ring region is 64 KiB per
//! direction (1024 descriptors); any smaller [`DescriptorStorage`] works.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in clippy.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

pub mod constants;
pub mod dma;
pub mod driver;
pub mod error;
pub mod hal;
pub mod policy;

// Shared engine slot (requires critical-section)
#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Public Re-exports
// =============================================================================

pub use dma::{BufferDescriptor, DefaultRingStorage, DescriptorRing, DescriptorStorage};
pub use driver::{
    Coalescing, Direction, FeedConfig, FeedEngine, FeedState, InterruptBinding, IrqStatus,
    ResetPolicy,
};
pub use error::{ConfigError, ConfigResult, TransferError, TransferResult};
pub use hal::{
    DmaChannel, DmaController, InterruptController, NoDelay, Trigger,
    install_global_interrupt_handling,
};
pub use policy::{ContiguousFeed, FeedBuffers, FeedPolicy, Progress};

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::SharedFeed;
