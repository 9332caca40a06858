//! Error types for the scatter-gather feed engine
//!
//! Errors are organized by how they are handled:
//! - [`ConfigError`]: Wiring and configuration faults (device lookup, ring setup, reset)
//! - [`TransferError`]: Hardware transfer errors, the only recoverable kind
//!
//! A [`TransferError`] never reaches the caller as a `Result`: it is latched
//! by the interrupt handler, recovered by the next poll and kept for
//! inspection afterwards.
//!
//! Invariant violations (over-allocation, over-completion, reclaiming with no
//! rings configured) are not represented here: they are programming errors and
//! stop the program via [`fatal`].

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and wiring errors
///
/// These indicate a build or wiring mistake rather than a transient condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The DMA device identifier did not resolve to a device
    DeviceNotFound,
    /// The DMA engine is built in simple (register) mode, not scatter-gather
    NoScatterGather,
    /// The hardware rejected descriptor ring setup (empty region or channel running)
    RingSetupRejected,
    /// Coalescing count or delay out of range for the hardware
    InvalidCoalescing,
    /// Maximum per-descriptor payload is zero or exceeds the length field
    InvalidPayloadSize,
    /// Payload buffer does not meet the DMA alignment requirement
    MisalignedBuffer,
    /// The interrupt controller rejected a connect request
    ConnectFailed,
    /// DMA reset never reported completion within the retry budget
    ResetFailed,
    /// A transfer is already in progress
    AlreadyBusy,
    /// The previous session's buffers have not been taken back
    BuffersInUse,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::DeviceNotFound => "DMA device not found",
            ConfigError::NoScatterGather => "DMA engine not in scatter-gather mode",
            ConfigError::RingSetupRejected => "descriptor ring setup rejected",
            ConfigError::InvalidCoalescing => "invalid interrupt coalescing setting",
            ConfigError::InvalidPayloadSize => "invalid maximum payload size",
            ConfigError::MisalignedBuffer => "misaligned payload buffer",
            ConfigError::ConnectFailed => "interrupt connect failed",
            ConfigError::ResetFailed => "DMA reset failed",
            ConfigError::AlreadyBusy => "transfer already in progress",
            ConfigError::BuffersInUse => "previous transfer buffers not taken back",
        }
    }
}

// =============================================================================
// Transfer Errors
// =============================================================================

/// Hardware transfer errors
///
/// Caught in interrupt context, latched into the sticky error flag and
/// recovered by the next poll through a DMA reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// The channel raised its error interrupt
    IrqError,
    /// A completed descriptor carried an error status bit
    DescriptorStatus {
        /// Ring-local index of the faulting descriptor
        index: u16,
        /// Raw error bits from the status word
        bits: u32,
    },
}

impl core::fmt::Display for TransferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransferError::IrqError => f.write_str(self.as_str()),
            TransferError::DescriptorStatus { index, bits } => {
                write!(f, "{} (bd {index}, status {bits:#010x})", self.as_str())
            }
        }
    }
}

impl TransferError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferError::IrqError => "DMA error interrupt",
            TransferError::DescriptorStatus { .. } => "descriptor completed with error",
        }
    }
}

// =============================================================================
// Result Aliases
// =============================================================================

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for transfer bookkeeping
pub type TransferResult<T> = core::result::Result<T, TransferError>;

// =============================================================================
// Hard Stop
// =============================================================================

/// Stop on an unrecoverable fault.
///
/// Used for configuration faults found at run time, reset exhaustion and
/// byte-accounting invariant violations. Continuing with corrupted ring state
/// risks silent data corruption.
#[cold]
#[track_caller]
pub fn fatal(err: impl core::fmt::Display) -> ! {
    #[cfg(feature = "log")]
    log::error!("sg-dma-feed fatal: {err}");
    #[cfg(feature = "defmt")]
    defmt::error!("sg-dma-feed fatal fault");
    panic!("sg-dma-feed: {err}")
}

// =============================================================================
// Unit Tests
// =============================================================================
