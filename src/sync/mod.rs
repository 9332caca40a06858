//! Synchronization and concurrency support
//!
//! [`SharedFeed`] is a static slot for a feed engine serviced from both the
//! main loop and the interrupt handlers.
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables this module. The critical section
//!   implementation comes from the HAL crate of the target platform.

mod shared;

pub use shared::SharedFeed;
