use crate::vm::GCHandle;
use gc_arena::{barrier::unlock, lock::RefLock, Collect, Collection, Gc};
use std::{
    fmt::{self, Debug, Formatter},
    ptr, slice,
};

pub type BufferRef<'gc> = Gc<'gc, Buffer<'gc>>;

/// Invoked with the base pointer and length when the collector sweeps a buffer.
pub type ReleaseFn = unsafe fn(*mut u8, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Backed by a zero-initialised allocation the buffer frees on release.
    Owned,
    /// A window over memory somebody else owns. Release does nothing.
    View,
}

unsafe fn release_owned(data: *mut u8, len: usize) {
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)));
}

// The region belongs to whichever native component produced the pointer.
unsafe fn release_view(_data: *mut u8, _len: usize) {}

/// A managed buffer handle: a base pointer, a length, and a release callback.
///
/// Buffers may *attach* other buffers. Attached buffers are traced through their
/// attacher, which keeps a pointee alive for as long as a slot or view refers to it.
pub struct Buffer<'gc> {
    data: *mut u8,
    len: usize,
    kind: BufferKind,
    release: ReleaseFn,
    attached: RefLock<Vec<BufferRef<'gc>>>,
}

unsafe impl<'gc> Collect for Buffer<'gc> {
    fn trace(&self, cc: &Collection) {
        self.attached.trace(cc);
    }
}

impl Drop for Buffer<'_> {
    fn drop(&mut self) {
        // SAFETY: `release` was chosen together with `data`/`len` at construction.
        unsafe { (self.release)(self.data, self.len) }
    }
}

impl<'gc> Buffer<'gc> {
    /// Allocates a zero-filled buffer that owns its memory.
    pub fn alloc(gc: GCHandle<'gc>, len: usize) -> BufferRef<'gc> {
        Self::from_boxed(gc, vec![0u8; len].into_boxed_slice())
    }

    pub fn from_bytes(gc: GCHandle<'gc>, bytes: &[u8]) -> BufferRef<'gc> {
        Self::from_boxed(gc, bytes.to_vec().into_boxed_slice())
    }

    fn from_boxed(gc: GCHandle<'gc>, boxed: Box<[u8]>) -> BufferRef<'gc> {
        let len = boxed.len();
        let data = Box::into_raw(boxed) as *mut u8;
        Gc::new(
            gc,
            Self {
                data,
                len,
                kind: BufferKind::Owned,
                release: release_owned,
                attached: RefLock::new(vec![]),
            },
        )
    }

    /// Builds a zero-copy view over `ptr`. A null pointer always yields a zero-length view.
    pub fn wrap_pointer(gc: GCHandle<'gc>, ptr: *mut u8, length: usize) -> BufferRef<'gc> {
        let len = if ptr.is_null() { 0 } else { length };
        Gc::new(
            gc,
            Self {
                data: ptr,
                len,
                kind: BufferKind::View,
                release: release_view,
                attached: RefLock::new(vec![]),
            },
        )
    }

    pub fn null_view(gc: GCHandle<'gc>) -> BufferRef<'gc> {
        Self::wrap_pointer(gc, ptr::null_mut(), 0)
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.data
    }

    pub fn address(&self) -> usize {
        self.data as usize
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Keeps `other` alive for as long as `this` is reachable.
    pub fn attach(gc: GCHandle<'gc>, this: BufferRef<'gc>, other: BufferRef<'gc>) {
        if Gc::ptr_eq(this, other) {
            return;
        }
        unlock!(Gc::write(gc, this), Buffer, attached)
            .borrow_mut()
            .push(other);
    }

    pub fn attached_count(&self) -> usize {
        self.attached.borrow().len()
    }

    /// # Safety
    ///
    /// For views, the caller must guarantee `len` bytes are readable at the base pointer
    /// and that nothing writes them while the slice is alive.
    pub unsafe fn as_bytes(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        slice::from_raw_parts(self.data, self.len)
    }

    /// # Safety
    ///
    /// As [`Buffer::as_bytes`], and additionally no other slice over the same memory may
    /// be alive while the returned one is.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_bytes_mut(&self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        slice::from_raw_parts_mut(self.data, self.len)
    }
}

impl Debug for Buffer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{:?} Buffer {:#x} len={} attached={}>",
            self.kind,
            self.address(),
            self.len,
            self.attached.borrow().len()
        )
    }
}
