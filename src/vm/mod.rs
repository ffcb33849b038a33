use crate::{memory::MAX_LENGTH, native::NativeLibraries};
use gc_arena::{Arena, Mutation, Rootable};
use std::{cell::RefCell, path::PathBuf};
use tracing::debug;

mod context;
pub mod handles;
pub mod heap;

pub use context::CallContext;
pub use heap::{HeapManager, RootedValue};

pub type GCHandle<'gc> = &'gc Mutation<'gc>;

pub type RuntimeArena = Arena<Rootable!['gc => HeapManager<'gc>]>;

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Largest length a view may be created with. Also caps zero-run scans.
    pub max_length: usize,
    /// Directory searched for native libraries by file-name prefix.
    pub library_path: Option<PathBuf>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_length: MAX_LENGTH,
            library_path: None,
        }
    }
}

/// Owns the managed heap that buffers, objects and reference handles live on.
pub struct Runtime {
    arena: RuntimeArena,
    options: RuntimeOptions,
    natives: RefCell<NativeLibraries>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    pub fn with_options(options: RuntimeOptions) -> Self {
        let natives = NativeLibraries::new(options.library_path.clone());
        Self {
            arena: Arena::new(|gc| HeapManager::new(gc)),
            options,
            natives: RefCell::new(natives),
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Runs `f` with access to the managed heap. Values that must outlive the call have to
    /// be rooted with [`CallContext::root`].
    pub fn mutate<T>(&self, f: impl for<'gc> FnOnce(&mut CallContext<'_, 'gc>) -> T) -> T {
        let mut natives = self.natives.borrow_mut();
        self.arena.mutate(|gc, heap| {
            let mut ctx = CallContext::new(gc, heap, &self.options, &mut natives);
            f(&mut ctx)
        })
    }

    /// Runs a full collection. Weak reference handles whose targets were swept read back
    /// as null afterwards.
    pub fn collect(&mut self) {
        let mut marked = None;
        while marked.is_none() {
            marked = self.arena.mark_all();
        }
        if let Some(marked) = marked {
            marked.finalize(|fc, heap| heap.finalize_check(fc));
        }
        self.arena.collect_all();
        debug!(live_handles = self.live_handles(), "collection finished");
    }

    /// Number of embedded references currently holding a handle.
    pub fn live_handles(&self) -> usize {
        self.arena.mutate(|_, heap| heap.ref_handles.borrow().live())
    }
}
