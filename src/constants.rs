//! Centralized Constants
//!
//! Single source of truth for the defaults and magic numbers used by the feed
//! engine.
//!
//! # Organization
//!
//! - **Descriptor memory**: alignment and default ring region sizes
//! - **Payload**: per-descriptor payload limits and buffer alignment
//! - **Reset**: retry and spin budgets for the recovery protocol
//! - **Interrupts**: controller priority and coalescing sentinels
//!
//! Descriptor and interrupt-status bit definitions live with the descriptor
//! (`dma/descriptor/bits.rs`).

// =============================================================================
// Descriptor Memory
// =============================================================================

/// Minimum alignment (and stride) of a buffer descriptor in bytes
pub const BD_MINIMUM_ALIGNMENT: usize = 0x40;

/// Default bytes of descriptor memory per ring (1024 descriptors)
pub const DEFAULT_RING_REGION_BYTES: usize = 0x10000;

// =============================================================================
// Payload
// =============================================================================

/// Default maximum payload per descriptor (fits a 14-bit length register)
pub const DEFAULT_MAX_PAYLOAD: usize = 1 << 13;

/// Widest payload the descriptor length field can express (26 bits)
pub const MAX_PAYLOAD_LIMIT: usize = 0x03FF_FFFF;

/// Required alignment of caller payload buffers
pub const BUFFER_ALIGNMENT: usize = 4;

// =============================================================================
// Reset
// =============================================================================

/// Number of reset attempts before giving up
pub const RESET_ATTEMPTS: u32 = 5;

/// Polls of the reset-done indicator per attempt
pub const RESET_SPIN_LIMIT: u32 = 10_000;

/// Default pause between reset-done polls in nanoseconds (pure spin)
pub const RESET_POLL_INTERVAL_NS: u32 = 0;

// =============================================================================
// Interrupts
// =============================================================================

/// Default interrupt controller priority for both DMA lines
pub const DEFAULT_IRQ_PRIORITY: u8 = 0xA0;

/// Largest interrupt coalescing count supported by the channel
pub const MAX_COALESCE_COUNT: u32 = 0xFF;

/// Largest interrupt coalescing delay supported by the channel
pub const MAX_COALESCE_DELAY: u32 = 0xFF;

// =============================================================================
// Tests
// =============================================================================
