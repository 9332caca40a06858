//! Descriptor memory regions.
//!
//! Rings borrow their descriptor memory. [`DescriptorStorage`] is the usual
//! source (a `static` placed in DMA-visible memory); [`region_from_raw`]
//! covers memory handed over by a linker script.

use super::descriptor::BufferDescriptor;
use crate::constants::{BD_MINIMUM_ALIGNMENT, DEFAULT_RING_REGION_BYTES};
use crate::error::{ConfigError, ConfigResult};

/// Number of descriptors that fit in a region of `bytes` bytes
#[must_use]
pub const fn descriptor_count(bytes: usize) -> usize {
    bytes / BD_MINIMUM_ALIGNMENT
}

/// Statically sized descriptor memory for one ring
#[repr(C, align(64))]
pub struct DescriptorStorage<const N: usize> {
    descriptors: [BufferDescriptor; N],
}

/// Storage sized for the default 64 KiB ring region
pub type DefaultRingStorage = DescriptorStorage<{ descriptor_count(DEFAULT_RING_REGION_BYTES) }>;

impl<const N: usize> DescriptorStorage<N> {
    /// Create zeroed storage (const, suitable for static initialization)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptors: [const { BufferDescriptor::new() }; N],
        }
    }

    /// Region size in bytes
    #[must_use]
    pub const fn size_bytes(&self) -> usize {
        N * BufferDescriptor::SIZE
    }

    /// Borrow the descriptors as a ring region
    #[must_use]
    pub fn as_slice(&self) -> &[BufferDescriptor] {
        &self.descriptors
    }
}

impl<const N: usize> Default for DescriptorStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a descriptor region over raw memory.
///
/// The region is zeroed descriptor by descriptor. Trailing bytes that do not
/// fill a whole descriptor are left untouched.
///
/// # Errors
///
/// `ConfigError::RingSetupRejected` if `base` is null or not aligned to
/// [`BD_MINIMUM_ALIGNMENT`].
///
/// # Safety
///
/// `base..base + bytes` must be valid for writes, unused by anything else for
/// `'a`, and visible to the DMA engine.
pub unsafe fn region_from_raw<'a>(
    base: *mut u8,
    bytes: usize,
) -> ConfigResult<&'a [BufferDescriptor]> {
    if base.is_null() || (base as usize) % BD_MINIMUM_ALIGNMENT != 0 {
        return Err(ConfigError::RingSetupRejected);
    }
    let count = descriptor_count(bytes);
    let first = base.cast::<BufferDescriptor>();
    for i in 0..count {
        // SAFETY: in bounds and aligned per the caller contract and check above
        unsafe { first.add(i).write(BufferDescriptor::new()) };
    }
    // SAFETY: every element was initialized above
    Ok(unsafe { core::slice::from_raw_parts(first, count) })
}

// =============================================================================
// Tests
// =============================================================================
