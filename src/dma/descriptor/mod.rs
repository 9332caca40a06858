//! Scatter-gather buffer descriptor.
//!
//! Each descriptor points to one payload buffer and carries a control word
//! written by software plus a status word written back by the DMA engine.

pub mod bits;

use bits::{ctrl, sts};

/// Volatile cell wrapper for descriptor fields
///
/// Ensures all accesses are volatile to prevent compiler optimization
/// from reordering or caching descriptor field accesses.
#[repr(transparent)]
pub(crate) struct VolatileCell<T: Copy> {
    value: core::cell::UnsafeCell<T>,
}

// Safety: every access is a single volatile read or write of a word-sized
// value; the DMA engine is the only other writer.
unsafe impl<T: Copy> Sync for VolatileCell<T> {}

impl<T: Copy> VolatileCell<T> {
    /// Create a new volatile cell with the given initial value
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self {
            value: core::cell::UnsafeCell::new(value),
        }
    }

    /// Read the value (volatile read)
    #[inline(always)]
    pub fn get(&self) -> T {
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write a value (volatile write)
    #[inline(always)]
    pub fn set(&self, value: T) {
        unsafe { core::ptr::write_volatile(self.value.get(), value) }
    }

    /// Update the value using a function (read-modify-write)
    #[cfg(test)]
    #[inline(always)]
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        let old = self.get();
        self.set(f(old));
    }
}

/// Scatter-gather buffer descriptor (64 bytes, 64-byte aligned).
///
/// Field order matches the hardware layout; the descriptor is shared with the
/// DMA engine, so every field the engine touches is volatile.
#[repr(C, align(64))]
pub struct BufferDescriptor {
    /// NXTDESC: next descriptor address, low word
    next_lo: VolatileCell<u32>,
    /// NXTDESC_MSB: next descriptor address, high word
    next_hi: VolatileCell<u32>,
    /// BUFFER_ADDRESS: payload buffer address, low word
    buffer_lo: VolatileCell<u32>,
    /// BUFFER_ADDRESS_MSB: payload buffer address, high word
    buffer_hi: VolatileCell<u32>,
    /// Multichannel control (unused)
    _mcctl: u32,
    /// Stride control (unused)
    _stride: u32,
    /// CONTROL: requested length and SOF/EOF flags
    control: VolatileCell<u32>,
    /// STATUS: transferred length, completion and error bits
    status: VolatileCell<u32>,
    /// User application words APP0..APP4 (unused)
    _app: [u32; 5],
    /// Software identifier, never read by hardware
    id: VolatileCell<u32>,
    /// Padding to the 64-byte stride
    _reserved: [u32; 2],
}

impl BufferDescriptor {
    /// Size of the descriptor in bytes
    pub const SIZE: usize = 64;

    /// Create a new zeroed descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_lo: VolatileCell::new(0),
            next_hi: VolatileCell::new(0),
            buffer_lo: VolatileCell::new(0),
            buffer_hi: VolatileCell::new(0),
            _mcctl: 0,
            _stride: 0,
            control: VolatileCell::new(0),
            status: VolatileCell::new(0),
            _app: [0; 5],
            id: VolatileCell::new(0),
            _reserved: [0; 2],
        }
    }

    /// Address of this descriptor as seen by the DMA engine.
    #[inline(always)]
    #[must_use]
    pub fn addr(&self) -> usize {
        core::ptr::from_ref(self) as usize
    }

    /// Chain this descriptor to `next`.
    pub fn link(&self, next: &BufferDescriptor) {
        let addr = next.addr() as u64;
        self.next_lo.set(addr as u32);
        self.next_hi.set((addr >> 32) as u32);
    }

    /// Next descriptor address in the chain.
    #[inline(always)]
    #[must_use]
    pub fn next_addr(&self) -> u64 {
        ((self.next_hi.get() as u64) << 32) | self.next_lo.get() as u64
    }

    /// Point the descriptor at a buffer and program length, flags and id.
    ///
    /// Clears the status word so a stale completion is never observed.
    pub fn prepare(&self, buffer: usize, len: usize, flags: u32, id: u32) {
        let addr = buffer as u64;
        self.buffer_lo.set(addr as u32);
        self.buffer_hi.set((addr >> 32) as u32);
        self.control
            .set(((len as u32) & ctrl::LENGTH_MASK) | (flags & ctrl::FLAGS_MASK));
        self.id.set(id);
        self.status.set(0);
    }

    /// Zero the status word before handing the descriptor to hardware.
    #[inline(always)]
    pub fn clear_status(&self) {
        self.status.set(0);
    }

    /// Return the descriptor to its post-link state, keeping the chain.
    pub fn reset(&self) {
        self.buffer_lo.set(0);
        self.buffer_hi.set(0);
        self.control.set(0);
        self.status.set(0);
        self.id.set(0);
    }

    /// Payload buffer address.
    #[inline(always)]
    #[must_use]
    pub fn buffer_addr(&self) -> u64 {
        ((self.buffer_hi.get() as u64) << 32) | self.buffer_lo.get() as u64
    }

    /// Requested transfer length from the control word.
    #[inline(always)]
    #[must_use]
    pub fn requested_length(&self) -> usize {
        (self.control.get() & ctrl::LENGTH_MASK) as usize
    }

    /// SOF/EOF flags from the control word.
    #[inline(always)]
    #[must_use]
    pub fn control_flags(&self) -> u32 {
        self.control.get() & ctrl::FLAGS_MASK
    }

    /// Bytes actually transferred, as reported by hardware.
    #[inline(always)]
    #[must_use]
    pub fn transferred_length(&self) -> usize {
        (self.status.get() & sts::LENGTH_MASK) as usize
    }

    /// Check if hardware has finished with this descriptor.
    #[inline(always)]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        (self.status.get() & sts::COMPLETE) != 0
    }

    /// Error bits from the status word (zero when clean).
    #[inline(always)]
    #[must_use]
    pub fn error_bits(&self) -> u32 {
        self.status.get() & sts::ALL_ERRORS
    }

    /// Software identifier written by [`prepare`](Self::prepare).
    #[inline(always)]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id.get()
    }

    /// Raw control word for debugging.
    #[inline(always)]
    #[must_use]
    pub fn raw_control(&self) -> u32 {
        self.control.get()
    }

    /// Raw status word for debugging.
    #[inline(always)]
    #[must_use]
    pub fn raw_status(&self) -> u32 {
        self.status.get()
    }

    /// Write back a status word the way the DMA engine does.
    #[cfg(test)]
    pub(crate) fn write_back(&self, len: usize, error_bits: u32) {
        self.status.update(|_| {
            sts::COMPLETE | (error_bits & sts::ALL_ERRORS) | ((len as u32) & sts::LENGTH_MASK)
        });
    }
}

impl Default for BufferDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
