//! Optional leak-tracking instrumentation for tests (`spec.md` §4.1
//! "Memory-check mode").
//!
//! The source's memory-check mode tags every heap allocation with a
//! generation counter and walks live objects at shutdown to report
//! anything outliving its expected scope. Under `Rc`+`Drop` there is no
//! equivalent use-after-free or double-free class to catch — the borrow
//! checker and automatic drop glue already rule those out — so this
//! module keeps only what's still useful in Rust: a scoped counter tests
//! can use to assert that everything allocated under a tag was also
//! freed by the time a scope ends, which catches `Rc` cycles and
//! "forgot to drop a clone" bugs that `Drop` alone won't surface.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A monotonically increasing tag distinguishing one tracked scope from
/// the next (`original_source`'s per-run generation epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

#[derive(Default)]
struct Counts {
    live: HashMap<&'static str, i64>,
}

/// Tracks live-allocation counts per named kind, scoped to one
/// [`Generation`]. Not thread-safe; intended for single-threaded test use.
#[derive(Clone)]
pub struct LeakTracker {
    generation: Generation,
    counts: Rc<RefCell<Counts>>,
}

impl LeakTracker {
    pub fn new(generation: Generation) -> Self {
        LeakTracker {
            generation,
            counts: Rc::new(RefCell::new(Counts::default())),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Record an allocation of `kind`, returning a guard that records the
    /// matching free on drop.
    pub fn track(&self, kind: &'static str) -> LeakGuard {
        *self.counts.borrow_mut().live.entry(kind).or_insert(0) += 1;
        LeakGuard {
            kind,
            counts: self.counts.clone(),
        }
    }

    /// Kinds with a nonzero live count, paired with that count.
    pub fn outstanding(&self) -> Vec<(&'static str, i64)> {
        self.counts
            .borrow()
            .live
            .iter()
            .filter(|&(_, &n)| n != 0)
            .map(|(&k, &n)| (k, n))
            .collect()
    }

    pub fn is_balanced(&self) -> bool {
        self.outstanding().is_empty()
    }

    /// Panics naming every kind with a nonzero live count. Call at the end
    /// of a test scope in place of the source's shutdown leak report.
    pub fn assert_balanced(&self) {
        let outstanding = self.outstanding();
        assert!(
            outstanding.is_empty(),
            "generation {:?} leaked: {:?}",
            self.generation,
            outstanding
        );
    }
}

/// Decrements its kind's live count when dropped.
pub struct LeakGuard {
    kind: &'static str,
    counts: Rc<RefCell<Counts>>,
}

impl Drop for LeakGuard {
    fn drop(&mut self) {
        if let Some(n) = self.counts.borrow_mut().live.get_mut(self.kind) {
            *n -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_scope_reports_nothing_outstanding() {
        let tracker = LeakTracker::new(Generation(1));
        {
            let _a = tracker.track("node");
            let _b = tracker.track("node");
        }
        assert!(tracker.is_balanced());
        tracker.assert_balanced();
    }

    #[test]
    fn unreleased_guard_shows_up_as_outstanding() {
        let tracker = LeakTracker::new(Generation(2));
        let guard = tracker.track("struct_instance");
        assert_eq!(tracker.outstanding(), vec![("struct_instance", 1)]);
        drop(guard);
        assert!(tracker.is_balanced());
    }

    #[test]
    #[should_panic(expected = "leaked")]
    fn assert_balanced_panics_on_leak() {
        let tracker = LeakTracker::new(Generation(3));
        let _guard = tracker.track("value");
        tracker.assert_balanced();
    }
}
