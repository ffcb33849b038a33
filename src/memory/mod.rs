//! Raw memory operations over managed buffers.
//!
//! Nothing here validates that an address is mapped: addresses come from buffer handles
//! and from pointer-sized words stored inside them, and the caller vouches for both.
//! The only checks are the ones each operation documents (null, slot bounds, caps).

use crate::value::Buffer;
use std::{mem::size_of, ptr};

pub mod address;
pub mod embed;
pub mod pointer;
pub mod scalar;
pub mod scan;

pub use address::{endianness, Endianness};
pub use embed::RefKind;
pub use scalar::{ByteOrder, IntInput};

pub const POINTER_SIZE: usize = size_of::<usize>();

/// Largest length a view may be given, and the ceiling for zero-run scans.
pub const MAX_LENGTH: usize = 0x3fff_ffff;

/// `base(buf) + offset`, wrapping.
pub fn resolve(buf: &Buffer<'_>, offset: i64) -> usize {
    buf.address().wrapping_add_signed(offset as isize)
}

/// # Safety
///
/// `addr` must be readable for a pointer-sized value.
pub unsafe fn read_word(addr: usize) -> usize {
    ptr::read_unaligned(addr as *const usize)
}

/// # Safety
///
/// `addr` must be writable for a pointer-sized value.
pub unsafe fn write_word(addr: usize, value: usize) {
    ptr::write_unaligned(addr as *mut usize, value)
}

/// Checks that `[offset, offset + POINTER_SIZE)` lies inside `buf`.
pub(crate) fn slot_in_bounds(buf: &Buffer<'_>, offset: i64) -> bool {
    offset >= 0
        && (offset as u64)
            .checked_add(POINTER_SIZE as u64)
            .is_some_and(|end| end <= buf.len() as u64)
}
