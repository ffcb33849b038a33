use crate::{
    error::{AccessError, RefError},
    native::NativeLibraries,
    value::{Buffer, BufferRef, ObjectRef, Value},
    vm::{GCHandle, HeapManager, RootedValue, RuntimeOptions},
};
use tracing::warn;

/// Everything a native operation can touch during one call into the heap.
pub struct CallContext<'a, 'gc> {
    pub gc: GCHandle<'gc>,
    pub heap: &'a HeapManager<'gc>,
    options: &'a RuntimeOptions,
    natives: &'a mut NativeLibraries,
    reported: Vec<RefError>,
}

impl<'a, 'gc> CallContext<'a, 'gc> {
    pub(super) fn new(
        gc: GCHandle<'gc>,
        heap: &'a HeapManager<'gc>,
        options: &'a RuntimeOptions,
        natives: &'a mut NativeLibraries,
    ) -> Self {
        Self {
            gc,
            heap,
            options,
            natives,
            reported: vec![],
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        self.options
    }

    /// Creates a view of `length` bytes at `ptr`, refusing lengths above the configured
    /// maximum.
    pub fn wrap_pointer(
        &self,
        ptr: *mut u8,
        length: usize,
    ) -> Result<BufferRef<'gc>, AccessError> {
        let max = self.options.max_length;
        if length > max {
            return Err(AccessError::TooLong { length, max });
        }
        Ok(Buffer::wrap_pointer(self.gc, ptr, length))
    }

    pub fn alloc(&self, len: usize) -> BufferRef<'gc> {
        Buffer::alloc(self.gc, len)
    }

    pub fn buffer_from(&self, bytes: &[u8]) -> BufferRef<'gc> {
        Buffer::from_bytes(self.gc, bytes)
    }

    pub fn object(&self) -> ObjectRef<'gc> {
        ObjectRef::new(self.gc)
    }

    pub fn null_view(&self) -> BufferRef<'gc> {
        self.heap.null_view()
    }

    pub fn null_pointer(&self) -> BufferRef<'gc> {
        self.heap.null_pointer()
    }

    pub fn root(&self, value: impl Into<Value<'gc>>) -> RootedValue {
        self.heap.root(self.gc, value.into())
    }

    pub fn fetch(&self, handle: &RootedValue) -> Value<'gc> {
        self.heap.fetch(handle)
    }

    /// Records a failure that is not raised to the caller.
    pub fn report(&mut self, error: RefError) {
        warn!(%error, "operation failed without raising");
        self.reported.push(error);
    }

    pub fn reported(&self) -> &[RefError] {
        &self.reported
    }

    pub fn take_reported(&mut self) -> Vec<RefError> {
        std::mem::take(&mut self.reported)
    }

    /// A zero-length view at the address of an exported symbol. Use `reinterpret` to give
    /// it a size.
    pub fn symbol_view(
        &mut self,
        library: &str,
        symbol: &str,
    ) -> Result<BufferRef<'gc>, RefError> {
        let addr = self.natives.symbol_address(library, symbol)?;
        Ok(Buffer::wrap_pointer(self.gc, addr as *mut u8, 0))
    }
}
