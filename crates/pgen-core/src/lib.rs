//! pgen-core: the value layer and persistent collections shared by every
//! other crate in the workspace.
//!
//! Mirrors the role of the teacher's `seq-core` crate (a clean foundation
//! shared across multiple stack-based languages) but the payload is
//! different: instead of a 40-byte FFI-friendly `StackValue` meant for
//! LLVM interop, [`Value`] is a plain tagged enum (see `DESIGN.md` for why
//! we departed from the teacher's C-ABI stack layout here) carrying either
//! an immediate or a persistent, structurally-shared collection.
//!
//! # Modules
//!
//! - `error`: core-layer error type (struct arity mismatches, bad klass
//!   references).
//! - `interner`: append-only string-literal table.
//! - `klass`: runtime klass registry for user-defined struct types.
//! - `value`: the `Value` enum, truth/equality/hash.
//! - `vector`: persistent 32-way trie vector (`Array`/`ArraySlice`).
//! - `hamt`: persistent HAMT map.
//! - `strdict`: persistent HAT-trie-style string-keyed dict.
//! - `cons`: cons list.
//! - `arena`: bump allocation for AST nodes and compiler work stacks.
//! - `node`: arena-allocated AST node shapes (syntax/token/cons/wrapper).
//! - `memcheck`: opt-in leak tracking for deterministic tests.
//! - `builtins`: shared name/id table for the built-in callback-action
//!   catalogue, so `pgen-grammar`'s compiler and `pgen-runtime`'s host
//!   impl agree without depending on each other.

pub mod arena;
pub mod builtins;
pub mod cons;
pub mod error;
pub mod hamt;
pub mod hasher;
pub mod interner;
pub mod klass;
pub mod memcheck;
pub mod node;
pub mod strdict;
pub mod value;
pub mod vector;

pub use arena::Arena;
pub use builtins::{builtin_id, builtin_name};
pub use cons::ConsList;
pub use error::CoreError;
pub use hamt::PersistentMap;
pub use hasher::{hash_bytes, KeyHasher};
pub use interner::StrInterner;
pub use klass::{KlassDef, KlassId, KlassRegistry, StructInstance};
pub use memcheck::{Generation, LeakTracker};
pub use node::{AstArena, AstNode, ClassId, NodeClassTable, NodeRef, SourceLoc};
pub use strdict::StringDict;
pub use value::{Token, Value};
pub use vector::Vector;
