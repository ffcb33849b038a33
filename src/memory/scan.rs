use crate::{
    error::AccessError,
    memory::resolve,
    value::{Buffer, BufferRef},
    vm::CallContext,
};
use std::ffi::CStr;

/// A view of `length` bytes at `buf + offset`. The view keeps `buf` alive.
pub fn reinterpret<'gc>(
    ctx: &CallContext<'_, 'gc>,
    buf: BufferRef<'gc>,
    length: usize,
    offset: i64,
) -> Result<BufferRef<'gc>, AccessError> {
    let start = resolve(&buf, offset);
    if start == 0 {
        return Err(AccessError::REINTERPRET);
    }
    let view = ctx.wrap_pointer(start as *mut u8, length)?;
    Buffer::attach(ctx.gc, view, buf);
    Ok(view)
}

/// Length of the data at `start` up to the first aligned run of `num_zeros` zero bytes.
///
/// Candidates are tested at multiples of `num_zeros` only, so a run straddling a stride
/// boundary is not found. The scan gives up at `max`. A zero-width terminator matches
/// immediately.
///
/// # Safety
///
/// Memory from `start` must be readable up to the terminator, or `max + num_zeros` bytes.
pub unsafe fn zero_run_length(start: *const u8, num_zeros: usize, max: usize) -> usize {
    let mut size = 0;
    while size < max {
        let terminated = (0..num_zeros).all(|i| *start.add(size + i) == 0);
        if terminated {
            break;
        }
        size += num_zeros;
    }
    size.min(max)
}

/// A view over the data at `buf + offset` up to a terminator of `num_zeros` zero bytes.
/// The view keeps `buf` alive.
///
/// # Safety
///
/// See [`zero_run_length`].
pub unsafe fn reinterpret_until_zeros<'gc>(
    ctx: &CallContext<'_, 'gc>,
    buf: BufferRef<'gc>,
    num_zeros: usize,
    offset: i64,
) -> Result<BufferRef<'gc>, AccessError> {
    let start = resolve(&buf, offset);
    if start == 0 {
        return Err(AccessError::REINTERPRET);
    }
    let size = zero_run_length(start as *const u8, num_zeros, ctx.options().max_length);
    let view = ctx.wrap_pointer(start as *mut u8, size)?;
    Buffer::attach(ctx.gc, view, buf);
    Ok(view)
}

/// The NUL-terminated string at `buf + offset`, with invalid UTF-8 replaced.
///
/// # Safety
///
/// A NUL byte must be reachable from the resolved address.
pub unsafe fn read_c_string(buf: &Buffer<'_>, offset: i64) -> Result<String, AccessError> {
    let start = resolve(buf, offset);
    if start == 0 {
        return Err(AccessError::READ);
    }
    Ok(CStr::from_ptr(start as *const _)
        .to_string_lossy()
        .into_owned())
}

/// Writes `s` followed by a NUL byte at `buf + offset`. Unlike [`read_c_string`] the whole
/// string must fit inside `buf`; nothing is written if it does not.
pub fn write_c_string(buf: &Buffer<'_>, offset: i64, s: &str) -> Result<(), AccessError> {
    if buf.address() == 0 {
        return Err(AccessError::WRITE);
    }
    let needed = s.len() + 1;
    let start = usize::try_from(offset)
        .ok()
        .filter(|start| start.checked_add(needed).is_some_and(|end| end <= buf.len()))
        .ok_or(AccessError::Overflow {
            offset,
            needed,
            len: buf.len(),
        })?;

    // SAFETY: `start + needed` was checked against the buffer length.
    let dst = unsafe { &mut buf.as_bytes_mut()[start..start + needed] };
    dst[..s.len()].copy_from_slice(s.as_bytes());
    dst[s.len()] = 0;
    Ok(())
}

/// A new owned buffer holding `s` and a trailing NUL.
pub fn alloc_c_string<'gc>(ctx: &CallContext<'_, 'gc>, s: &str) -> BufferRef<'gc> {
    let buf = ctx.alloc(s.len() + 1);
    unsafe { buf.as_bytes_mut()[..s.len()].copy_from_slice(s.as_bytes()) };
    buf
}
