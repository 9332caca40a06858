//! Buffer descriptor and channel interrupt bit field constants.
//!
//! Layout follows the AXI DMA scatter-gather descriptor: a control word
//! written by software and a status word written back by the hardware.

#![allow(dead_code)]

// =============================================================================
// CONTROL (Descriptor Word 6) - written by software
// =============================================================================

/// Descriptor control word bit field constants
pub mod ctrl {
    /// Requested buffer length mask (26 bits)
    pub const LENGTH_MASK: u32 = 0x03FF_FFFF;
    /// Transmit End of Frame - last descriptor of an outbound burst
    pub const TXEOF: u32 = 1 << 26;
    /// Transmit Start of Frame - first descriptor of an outbound burst
    pub const TXSOF: u32 = 1 << 27;

    /// All control flag bits
    pub const FLAGS_MASK: u32 = TXSOF | TXEOF;
}

// =============================================================================
// STATUS (Descriptor Word 7) - written back by hardware
// =============================================================================

/// Descriptor status word bit field constants
pub mod sts {
    /// Transferred length mask (26 bits)
    pub const LENGTH_MASK: u32 = 0x03FF_FFFF;
    /// Receive End of Frame - stream TLAST observed in this buffer
    pub const RXEOF: u32 = 1 << 26;
    /// Receive Start of Frame - first buffer of an inbound frame
    pub const RXSOF: u32 = 1 << 27;
    /// DMA Internal Error
    pub const INT_ERR: u32 = 1 << 28;
    /// DMA Slave Error - slave responded with SLVERR
    pub const SLV_ERR: u32 = 1 << 29;
    /// DMA Decode Error - address decode failed
    pub const DEC_ERR: u32 = 1 << 30;
    /// Complete - hardware finished with this descriptor
    pub const COMPLETE: u32 = 1 << 31;

    /// All possible descriptor error bits
    pub const ALL_ERRORS: u32 = INT_ERR | SLV_ERR | DEC_ERR;
}

// =============================================================================
// Channel interrupt status (DMASR) / enable (DMACR)
// =============================================================================

/// Channel interrupt bit field constants (same positions in control and status)
pub mod irq {
    /// Interrupt on Complete - coalescing count reached
    pub const IOC: u32 = 1 << 12;
    /// Delay timer expired with completions pending
    pub const DELAY: u32 = 1 << 13;
    /// Error interrupt - any internal, slave, decode or SG error
    pub const ERROR: u32 = 1 << 14;

    /// Every interrupt source the feed engine uses
    pub const ALL: u32 = IOC | DELAY | ERROR;
    /// Sources that mean descriptors may have completed
    pub const COMPLETION: u32 = IOC | DELAY;
}
