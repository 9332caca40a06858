//! Descriptor memory and ring management.
//!
//! - [`descriptor`]: the hardware buffer descriptor and its bit fields
//! - [`ring`]: four-group ring bookkeeping driving one channel
//! - [`region`]: descriptor storage and sizing helpers

pub mod descriptor;
pub mod region;
pub mod ring;

pub use descriptor::BufferDescriptor;
pub use region::{DefaultRingStorage, DescriptorStorage, descriptor_count, region_from_raw};
pub use ring::{DescriptorRing, DescriptorSpan};
