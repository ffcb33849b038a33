//! Managed object references stored in raw memory.
//!
//! The cell receives a handle word from the heap's [`RefHandleTable`], never the object's
//! address. Weak handles are cleared when their target is collected; persistent handles
//! keep their target alive until the cell is overwritten.
//!
//! [`RefHandleTable`]: crate::vm::handles::RefHandleTable

use crate::{
    error::AccessError,
    memory::{read_word, resolve, write_word},
    value::{Buffer, ObjectRef},
    vm::HeapManager,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Weak,
    Persistent,
}

impl RefKind {
    pub fn from_persistent(persistent: bool) -> Self {
        if persistent {
            Self::Persistent
        } else {
            Self::Weak
        }
    }
}

/// Embeds `object` at `buf + offset`. If the cell already holds a handle minted for it,
/// that handle is rebound rather than a new one allocated.
///
/// # Safety
///
/// `buf + offset` must be readable and writable for a pointer-sized value unless null.
pub unsafe fn write_object<'gc>(
    heap: &HeapManager<'gc>,
    buf: &Buffer<'gc>,
    offset: i64,
    object: ObjectRef<'gc>,
    kind: RefKind,
) -> Result<(), AccessError> {
    let cell = resolve(buf, offset);
    if cell == 0 {
        return Err(AccessError::WRITE);
    }
    let existing = read_word(cell);
    let word = heap
        .ref_handles
        .borrow_mut()
        .store(existing, cell, object, kind)?;
    write_word(cell, word);
    Ok(())
}

/// Reads back an embedded reference. Empty cells, cleared weak references and words that
/// were not minted for this cell all read as `None`.
///
/// # Safety
///
/// `buf + offset` must be readable for a pointer-sized value unless null.
pub unsafe fn read_object<'gc>(
    heap: &HeapManager<'gc>,
    buf: &Buffer<'gc>,
    offset: i64,
) -> Result<Option<ObjectRef<'gc>>, AccessError> {
    let cell = resolve(buf, offset);
    if cell == 0 {
        return Err(AccessError::READ);
    }
    let word = read_word(cell);
    Ok(heap
        .ref_handles
        .borrow()
        .get(word)
        .filter(|b| b.cell == cell)
        .map(|b| b.target))
}
