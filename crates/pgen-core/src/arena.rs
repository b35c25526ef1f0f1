//! Bump allocation for AST nodes and compiler work stacks (`spec.md`
//! §4.2.4). The teacher's `seq-core` crate already reaches for `bumpalo`
//! for its strand-local arenas (`crates/core/Cargo.toml`); we use the
//! same crate here rather than hand-rolling a chunked allocator, since
//! `bumpalo::Bump` already gives push/pop save-points (`Bump::reset`)
//! and bulk free on drop — the source's per-chunk bulk free, expressed
//! with the host language's own allocator instead of a hand-rolled one
//! (Design Notes §9, "macro-generated collections").
//!
//! The source caps a single allocation at one 256-word chunk and notes a
//! "one-shot chunk" variant as future work for larger requests;
//! `bumpalo` has no such cap (it falls back to an oversized chunk
//! automatically), so that limitation doesn't carry over.

use bumpalo::Bump;

/// A bump arena. `reset` drops everything allocated from it so far.
pub struct Arena {
    bump: Bump,
}

impl Arena {
    pub fn new() -> Self {
        Arena { bump: Bump::new() }
    }

    pub fn alloc<T>(&self, val: T) -> &T {
        self.bump.alloc(val)
    }

    pub fn alloc_slice_copy<T: Copy>(&self, slice: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(slice)
    }

    /// Free everything allocated so far. Any references derived from this
    /// arena must not outlive the reset — enforced by Rust's borrow
    /// checker since `reset` takes `&mut self`.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_usable_reference() {
        let arena = Arena::new();
        let x: &i64 = arena.alloc(42);
        assert_eq!(*x, 42);
    }

    #[test]
    fn reset_frees_allocations() {
        let mut arena = Arena::new();
        arena.alloc(1i64);
        arena.alloc(2i64);
        assert!(arena.allocated_bytes() > 0);
        arena.reset();
        assert_eq!(arena.allocated_bytes(), 0);
    }
}
