//! Handle table backing object references embedded in raw memory.
//!
//! A cell that holds an embedded reference stores a single machine word: the handle.
//! The low half of the word is `index + 1` (so an all-zero cell is "no reference"), the
//! high half is the entry's generation. Freeing an entry bumps its generation, which
//! makes every word previously minted for that slot stale.

use crate::{error::AccessError, memory::RefKind, value::ObjectRef};
use gc_arena::{Collect, Collection, Finalization, Gc};
use tracing::trace;

const INDEX_BITS: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;

#[derive(Clone, Copy, Debug)]
pub struct Binding<'gc> {
    pub target: ObjectRef<'gc>,
    pub kind: RefKind,
    /// Address of the cell the handle was written into.
    pub cell: usize,
}

struct HandleEntry<'gc> {
    generation: usize,
    binding: Option<Binding<'gc>>,
}

#[derive(Default)]
pub struct RefHandleTable<'gc> {
    entries: Vec<HandleEntry<'gc>>,
    free: Vec<usize>,
}

// Persistent bindings are strong; weak ones are cleared in `clear_dead`.
unsafe impl<'gc> Collect for RefHandleTable<'gc> {
    fn trace(&self, cc: &Collection) {
        for binding in self.entries.iter().filter_map(|e| e.binding.as_ref()) {
            if binding.kind == RefKind::Persistent {
                binding.target.trace(cc);
            }
        }
    }
}

fn encode(index: usize, generation: usize) -> usize {
    (generation << INDEX_BITS) | (index + 1)
}

fn decode(word: usize) -> Option<(usize, usize)> {
    match word & INDEX_MASK {
        0 => None,
        low => Some((low - 1, word >> INDEX_BITS)),
    }
}

impl<'gc> RefHandleTable<'gc> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a handle word. Empty, stale and foreign words all resolve to `None`.
    pub fn get(&self, word: usize) -> Option<Binding<'gc>> {
        let (index, generation) = decode(word)?;
        let entry = self.entries.get(index)?;
        if entry.generation != generation {
            return None;
        }
        entry.binding
    }

    /// Binds `target` for the cell at `cell` and returns the word to store there.
    ///
    /// If `existing` (the word currently in the cell) is a live handle minted for this same
    /// cell, that entry is rebound in place and the same word is returned, so rewriting a
    /// cell never grows the table.
    pub fn store(
        &mut self,
        existing: usize,
        cell: usize,
        target: ObjectRef<'gc>,
        kind: RefKind,
    ) -> Result<usize, AccessError> {
        let binding = Binding { target, kind, cell };

        if let Some((index, generation)) = decode(existing) {
            if let Some(entry) = self.entries.get_mut(index) {
                if entry.generation == generation {
                    if let Some(current) = entry.binding.as_mut().filter(|b| b.cell == cell) {
                        trace!(index, ?kind, "rebinding reference handle");
                        *current = binding;
                        return Ok(existing);
                    }
                }
            }
        }

        self.allocate(binding)
    }

    fn allocate(&mut self, binding: Binding<'gc>) -> Result<usize, AccessError> {
        trace!(kind = ?binding.kind, cell = binding.cell, "allocating reference handle");
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index];
            entry.binding = Some(binding);
            return Ok(encode(index, entry.generation));
        }

        let index = self.entries.len();
        if index >= INDEX_MASK {
            return Err(AccessError::HandlesExhausted);
        }
        self.entries.push(HandleEntry {
            generation: 0,
            binding: Some(binding),
        });
        Ok(encode(index, 0))
    }

    fn release(&mut self, index: usize) {
        let entry = &mut self.entries[index];
        entry.binding = None;
        entry.generation = (entry.generation + 1) & INDEX_MASK;
        self.free.push(index);
    }

    /// Frees every weak entry whose target did not survive marking.
    pub fn clear_dead(&mut self, fc: &Finalization<'gc>) -> usize {
        let dead: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e.binding {
                Some(b) if b.kind == RefKind::Weak && Gc::is_dead(fc, b.target.0) => Some(i),
                _ => None,
            })
            .collect();

        for &index in &dead {
            trace!(index, "clearing weak reference handle");
            self.release(index);
        }
        dead.len()
    }

    /// Number of bound entries.
    pub fn live(&self) -> usize {
        self.entries.iter().filter(|e| e.binding.is_some()).count()
    }
}
