use crate::{
    error::AccessError,
    memory::{read_word, resolve, slot_in_bounds},
    value::Buffer,
};
use std::sync::OnceLock;

/// Address of `buf` plus `offset`. Never dereferences anything.
pub fn address(buf: &Buffer<'_>, offset: i64) -> usize {
    resolve(buf, offset)
}

/// Like [`address`], but with `external` the pointer-sized word stored at the location is
/// returned instead. A null location reads as 0.
///
/// # Safety
///
/// With `external`, the resolved location must be readable for a pointer-sized value.
pub unsafe fn address_with(buf: &Buffer<'_>, offset: i64, external: bool) -> usize {
    let addr = resolve(buf, offset);
    if external && addr != 0 {
        read_word(addr)
    } else if external {
        0
    } else {
        addr
    }
}

/// Lowercase hex without a `0x` prefix.
pub fn format_hex(addr: usize) -> String {
    format!("{addr:x}")
}

/// # Safety
///
/// See [`address_with`].
pub unsafe fn hex_address(buf: &Buffer<'_>, offset: i64, external: bool) -> String {
    format_hex(address_with(buf, offset, external))
}

pub fn is_null(buf: &Buffer<'_>, offset: i64) -> bool {
    resolve(buf, offset) == 0
}

/// Whether the pointer-sized slot at `offset` holds zero.
///
/// # Safety
///
/// `buf` must be readable over its whole length.
pub unsafe fn contains_null_pointer(buf: &Buffer<'_>, offset: i64) -> Result<bool, AccessError> {
    if !slot_in_bounds(buf, offset) {
        return Err(AccessError::OutOfBounds {
            offset,
            len: buf.len(),
        });
    }
    Ok(read_word(resolve(buf, offset)) == 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Big => "BE",
            Self::Little => "LE",
        }
    }
}

static ENDIANNESS: OnceLock<Endianness> = OnceLock::new();

/// Probed once: store 1 in a multi-byte integer and look at its first byte.
pub fn endianness() -> Endianness {
    *ENDIANNESS.get_or_init(|| match 1u32.to_ne_bytes()[0] {
        0 => Endianness::Big,
        _ => Endianness::Little,
    })
}
