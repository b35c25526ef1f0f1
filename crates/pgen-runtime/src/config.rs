//! Runtime/compile configuration (`spec.md` §5 "Cancellation & timeouts",
//! §4.1 "Memory-check mode"), mirroring the teacher's `CompilerConfig`
//! pattern: one small, cloneable struct carrying the knobs a host
//! embeds a parser with, instead of scattering constants through the
//! VM crates.

/// Knobs for compiling a grammar spec into a [`crate::ParserInstance`].
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Caps nested `struct`/list construction depth a callback body may
    /// reach (`Op::Meta { max_container_depth }`); `None` leaves the
    /// bytecode compiler's own default in place.
    pub max_container_depth: Option<u32>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig { max_container_depth: None }
    }
}

/// Knobs for a single `parse` call.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Per-opcode step budget across both VMs combined; `None` means
    /// unbounded. A decrementing counter, not a wall-clock timeout — the
    /// caller derives timeouts externally by picking a budget. Not yet
    /// enforced: `LexVm`/`PegVm`/callback `Vm` dispatch loops don't
    /// thread a counter through their `exec`/`run` calls, so this is
    /// recorded on the instance for a future wiring rather than checked
    /// today (see `DESIGN.md`'s `pgen-runtime` entry).
    pub step_budget: Option<u64>,
    /// Opt-in allocation tracking for tests (`pgen_core::memcheck`); off
    /// by default since it costs a `RefCell` borrow per tracked value.
    pub memcheck: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig { step_budget: None, memcheck: false }
    }
}
