use crate::{
    memory::POINTER_SIZE,
    value::{Buffer, BufferRef, Value},
    vm::{handles::RefHandleTable, GCHandle},
};
use gc_arena::{Collect, Collection, DynamicRoot, DynamicRootSet, Finalization, Rootable};
use std::cell::RefCell;
use tracing::debug;

type ValueSlot = Rootable![Value<'_>];

/// A value kept alive across separate `Runtime::mutate` calls.
#[derive(Collect)]
#[collect(require_static)]
pub struct RootedValue(DynamicRoot<ValueSlot>);

pub struct HeapManager<'gc> {
    roots: DynamicRootSet<'gc>,
    pub ref_handles: RefCell<RefHandleTable<'gc>>,
    null_view: BufferRef<'gc>,
    null_pointer: BufferRef<'gc>,
}

unsafe impl<'gc> Collect for HeapManager<'gc> {
    fn trace(&self, cc: &Collection) {
        self.roots.trace(cc);
        self.ref_handles.borrow().trace(cc);
        self.null_view.trace(cc);
        self.null_pointer.trace(cc);
    }
}

impl<'gc> HeapManager<'gc> {
    pub fn new(gc: GCHandle<'gc>) -> Self {
        Self {
            roots: DynamicRootSet::new(gc),
            ref_handles: RefCell::new(RefHandleTable::new()),
            null_view: Buffer::null_view(gc),
            null_pointer: Buffer::alloc(gc, POINTER_SIZE),
        }
    }

    pub fn root(&self, gc: GCHandle<'gc>, value: Value<'gc>) -> RootedValue {
        RootedValue(self.roots.stash::<ValueSlot>(gc, value))
    }

    pub fn fetch(&self, handle: &RootedValue) -> Value<'gc> {
        self.roots.fetch(&handle.0).clone()
    }

    /// The shared zero-length view at address 0.
    pub fn null_view(&self) -> BufferRef<'gc> {
        self.null_view
    }

    /// The shared pointer-sized, zero-filled buffer.
    pub fn null_pointer(&self) -> BufferRef<'gc> {
        self.null_pointer
    }

    pub fn finalize_check(&self, fc: &Finalization<'gc>) {
        let cleared = self.ref_handles.borrow_mut().clear_dead(fc);
        if cleared > 0 {
            debug!(cleared, "weak references cleared");
        }
    }
}
