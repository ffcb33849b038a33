//! Pointer-sized slots: reading them into views, storing buffer addresses into them, and
//! the two slot-indirect primitives `copy_memory` and `add_offset`.

use crate::{
    error::AccessError,
    memory::{read_word, resolve, slot_in_bounds, write_word, POINTER_SIZE},
    value::{Buffer, BufferRef},
    vm::CallContext,
};
use std::{cmp::Ordering, ptr};

/// Reads the pointer stored at `buf + offset`.
///
/// By default the result is a view of `length` bytes at that address. With `external`,
/// the result is instead a fresh pointer-sized buffer holding the address itself.
///
/// # Safety
///
/// `buf + offset` must be readable for a pointer-sized value unless it is null.
pub unsafe fn read_pointer<'gc>(
    ctx: &CallContext<'_, 'gc>,
    buf: &Buffer<'gc>,
    offset: i64,
    length: usize,
    external: bool,
) -> Result<BufferRef<'gc>, AccessError> {
    let slot = resolve(buf, offset);
    if slot == 0 {
        return Err(AccessError::READ);
    }
    let target = read_word(slot);

    if external {
        let holder = ctx.alloc(POINTER_SIZE);
        write_word(holder.address(), target);
        Ok(holder)
    } else {
        ctx.wrap_pointer(target as *mut u8, length)
    }
}

/// Stores into the pointer-sized slot at `dst + offset`.
///
/// `None` stores null. Otherwise the input's base address is stored or, with `external`,
/// the pointer-sized word found at the start of the input (null if the input is shorter
/// than a pointer). The slot must lie inside `dst`; nothing is written if it does not.
///
/// Keeping the input alive is the caller's job, see [`Buffer::attach`].
///
/// # Safety
///
/// `dst` must be writable over its whole length and, with `external`, `input` readable.
pub unsafe fn write_pointer(
    dst: &Buffer<'_>,
    offset: i64,
    input: Option<&Buffer<'_>>,
    external: bool,
) -> Result<(), AccessError> {
    if !slot_in_bounds(dst, offset) {
        return Err(AccessError::OutOfBounds {
            offset,
            len: dst.len(),
        });
    }

    let value = match input {
        None => 0,
        Some(src) if !external => src.address(),
        Some(src) if src.len() >= POINTER_SIZE => read_word(src.address()),
        Some(_) => 0,
    };
    write_word(resolve(dst, offset), value);
    Ok(())
}

fn slot_base(slot: &Buffer<'_>) -> Result<usize, AccessError> {
    if slot.len() < POINTER_SIZE {
        return Err(AccessError::SlotTooShort { len: slot.len() });
    }
    Ok(slot.address())
}

/// Copies `size` bytes from the address stored in `src`'s first slot to the address stored
/// in `dst`'s first slot. Overlapping regions are handled. A zero size touches nothing.
///
/// # Safety
///
/// Both stored addresses must be valid for `size` bytes.
pub unsafe fn copy_memory(
    dst: &Buffer<'_>,
    src: &Buffer<'_>,
    size: usize,
) -> Result<(), AccessError> {
    if size == 0 {
        return Ok(());
    }
    let to = read_word(slot_base(dst)?);
    let from = read_word(slot_base(src)?);
    if to == 0 {
        return Err(AccessError::WRITE);
    }
    if from == 0 {
        return Err(AccessError::READ);
    }
    ptr::copy(from as *const u8, to as *mut u8, size);
    Ok(())
}

/// Advances the address stored in `slot`'s first slot by `delta` bytes.
///
/// # Safety
///
/// `slot` must be writable over its whole length.
pub unsafe fn add_offset(slot: &Buffer<'_>, delta: i32) -> Result<(), AccessError> {
    if delta == 0 {
        return Ok(());
    }
    let base = slot_base(slot)?;
    let current = read_word(base);
    write_word(base, current.wrapping_add_signed(delta as isize));
    Ok(())
}

/// A view of `size` bytes at the address stored in `slot`'s first slot, advanced by
/// `offset`. The view keeps `slot` alive, and with it whatever `slot` has attached.
///
/// # Safety
///
/// The stored address plus `offset` must be valid for `size` bytes while the view is used.
pub unsafe fn read_from_pointer<'gc>(
    ctx: &CallContext<'_, 'gc>,
    slot: BufferRef<'gc>,
    offset: i64,
    size: usize,
) -> Result<BufferRef<'gc>, AccessError> {
    if slot.address() == 0 {
        return Err(AccessError::READ);
    }
    let target = read_word(slot_base(&slot)?);
    if target == 0 {
        return Err(AccessError::READ);
    }
    let start = target.wrapping_add_signed(offset as isize);
    let view = ctx.wrap_pointer(start as *mut u8, size)?;
    Buffer::attach(ctx.gc, view, slot);
    Ok(view)
}

/// Orders the addresses stored at `a + a_offset` and `b + b_offset`.
pub fn compare_pointer<'gc>(
    a: &Buffer<'gc>,
    b: &Buffer<'gc>,
    a_offset: i64,
    b_offset: i64,
) -> Result<Ordering, AccessError> {
    for (buf, offset) in [(a, a_offset), (b, b_offset)] {
        if !slot_in_bounds(buf, offset) {
            return Err(AccessError::OutOfBounds {
                offset,
                len: buf.len(),
            });
        }
    }
    // SAFETY: both slots lie inside their buffers.
    let (left, right) = unsafe {
        (
            read_word(resolve(a, a_offset)),
            read_word(resolve(b, b_offset)),
        )
    };
    Ok(left.cmp(&right))
}

/// A fresh pointer-sized buffer holding the address of `target`, with `target` attached.
pub fn reference<'gc>(ctx: &CallContext<'_, 'gc>, target: BufferRef<'gc>) -> BufferRef<'gc> {
    let holder = ctx.alloc(POINTER_SIZE);
    // SAFETY: `holder` was just allocated with room for one pointer.
    unsafe { write_word(holder.address(), target.address()) };
    Buffer::attach(ctx.gc, holder, target);
    holder
}
