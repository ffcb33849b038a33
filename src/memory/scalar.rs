//! Signed and unsigned 64-bit integers at arbitrary, possibly unaligned, addresses.

use crate::{
    error::AccessError,
    memory::resolve,
    value::{
        wide_int::{parse_i64, parse_u64},
        Buffer, WideInt,
    },
};
use std::ptr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Native,
    Big,
    Little,
}

impl ByteOrder {
    fn decode(self, bytes: [u8; 8]) -> u64 {
        match self {
            Self::Native => u64::from_ne_bytes(bytes),
            Self::Big => u64::from_be_bytes(bytes),
            Self::Little => u64::from_le_bytes(bytes),
        }
    }

    fn encode(self, v: u64) -> [u8; 8] {
        match self {
            Self::Native => v.to_ne_bytes(),
            Self::Big => v.to_be_bytes(),
            Self::Little => v.to_le_bytes(),
        }
    }
}

/// A value headed for a 64-bit slot.
#[derive(Debug, Clone, Copy)]
pub enum IntInput<'a> {
    Number(f64),
    Text(&'a str),
}

unsafe fn load(buf: &Buffer<'_>, offset: i64, order: ByteOrder) -> Result<u64, AccessError> {
    let addr = resolve(buf, offset);
    if addr == 0 {
        return Err(AccessError::READ);
    }
    Ok(order.decode(ptr::read_unaligned(addr as *const [u8; 8])))
}

unsafe fn store(
    buf: &Buffer<'_>,
    offset: i64,
    v: u64,
    order: ByteOrder,
) -> Result<(), AccessError> {
    let addr = resolve(buf, offset);
    if addr == 0 {
        return Err(AccessError::WRITE);
    }
    ptr::write_unaligned(addr as *mut [u8; 8], order.encode(v));
    Ok(())
}

/// # Safety
///
/// `buf + offset` must be readable for 8 bytes unless it is null.
pub unsafe fn read_int64(
    buf: &Buffer<'_>,
    offset: i64,
    order: ByteOrder,
) -> Result<WideInt, AccessError> {
    load(buf, offset, order).map(|v| WideInt::from_i64(v as i64))
}

/// # Safety
///
/// As [`read_int64`].
pub unsafe fn read_uint64(
    buf: &Buffer<'_>,
    offset: i64,
    order: ByteOrder,
) -> Result<WideInt, AccessError> {
    load(buf, offset, order).map(WideInt::from_u64)
}

/// Numbers are truncated toward zero and saturate at the `i64` limits. Text is parsed
/// before anything is written, so a malformed literal leaves memory untouched.
///
/// # Safety
///
/// `buf + offset` must be writable for 8 bytes unless it is null.
pub unsafe fn write_int64(
    buf: &Buffer<'_>,
    offset: i64,
    input: IntInput<'_>,
    order: ByteOrder,
) -> Result<(), AccessError> {
    let v = match input {
        IntInput::Number(n) => n as i64,
        IntInput::Text(s) => parse_i64(s)?,
    };
    store(buf, offset, v as u64, order)
}

/// Numbers go through the signed conversion first, so negatives wrap modulo 2^64.
///
/// # Safety
///
/// As [`write_int64`].
pub unsafe fn write_uint64(
    buf: &Buffer<'_>,
    offset: i64,
    input: IntInput<'_>,
    order: ByteOrder,
) -> Result<(), AccessError> {
    let v = match input {
        IntInput::Number(n) => n as i64 as u64,
        IntInput::Text(s) => parse_u64(s)?,
    };
    store(buf, offset, v, order)
}
