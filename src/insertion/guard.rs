use dashmap::DashMap;

use crate::dom::ElementId;

/// Per-element count of insertions currently in progress.
///
/// Entries are removed when their count returns to zero, so nothing is kept
/// for elements that are no longer being written to.
#[derive(Debug, Default)]
pub struct NestingCounter {
    depths: DashMap<ElementId, usize>,
}

/// Holds one level of nesting for an element until dropped.
#[must_use]
pub struct NestingGuard<'a> {
    counter: &'a NestingCounter,
    id: ElementId,
}

impl NestingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter one level for `id`, or `None` when `max` levels are already held.
    pub fn enter(&self, id: ElementId, max: usize) -> Option<NestingGuard<'_>> {
        if max == 0 {
            return None;
        }
        let mut depth = self.depths.entry(id).or_insert(0);
        if *depth >= max {
            return None;
        }
        *depth += 1;
        Some(NestingGuard { counter: self, id })
    }

    pub fn depth(&self, id: ElementId) -> usize {
        self.depths.get(&id).map(|depth| *depth).unwrap_or(0)
    }

    pub fn tracked(&self) -> usize {
        self.depths.len()
    }
}

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        self.counter.depths.remove_if_mut(&self.id, |_, depth| {
            *depth = depth.saturating_sub(1);
            *depth == 0
        });
    }
}
