use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use beatbox_shared::PatternGrid;

/// One consistent view of everything received so far
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    patterns: HashMap<String, PatternGrid>,
    order: Vec<String>,
}

impl StoreSnapshot {
    pub fn lookup(&self, label: &str) -> Option<&PatternGrid> {
        self.patterns.get(label)
    }

    /// Labels in arrival order, repeats included
    pub fn labels(&self) -> &[String] {
        &self.order
    }
}

/// Patterns received from other peers, keyed by label.
///
/// Writes go through read-copy-update on an [`ArcSwap`]: the receive loop
/// clones the current snapshot, applies the change and swaps it in. Readers
/// grab the current `Arc` and never block the writer.
#[derive(Debug, Default)]
pub struct RemotePatternStore {
    inner: ArcSwap<StoreSnapshot>,
}

impl RemotePatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest grid wins for a label; the display list keeps every arrival.
    pub fn record(&self, label: &str, grid: PatternGrid) {
        self.inner.rcu(|current| {
            let mut next = StoreSnapshot::clone(current);
            next.patterns.insert(label.to_string(), grid.clone());
            next.order.push(label.to_string());
            next
        });
    }

    /// A copy of the stored grid, safe to edit
    pub fn lookup(&self, label: &str) -> Option<PatternGrid> {
        self.inner.load().lookup(label).cloned()
    }

    pub fn ordered_labels(&self) -> Vec<String> {
        self.inner.load().order.clone()
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.inner.load_full()
    }

    pub fn len(&self) -> usize {
        self.inner.load().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
