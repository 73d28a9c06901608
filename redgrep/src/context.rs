// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! The compiler context (§9 "Global mutable state"): a single value
//! bundling the grammar view, the item matcher, the reduction graph, and
//! the precomputed state universe, built once from a loaded grammar and
//! treated as immutable afterwards. Passed by reference to every stage
//! instead of reaching for global state.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::errors::InternalInvariant;
use crate::grammar::{Lr1Table, StateId};
use crate::item_matcher::ItemMatcher;
use crate::pattern::{derive_reduce, KRESet};
use crate::redgraph::Redgraph;

/// Capability required of a value that can sit inside a `Reduce_op`/`ST`:
/// a one-step derivative indexed by the state that was consumed, and a way
/// to merge several such values into one (§9 "Polymorphism over derivable
/// values"). `KRESet` is the only implementor in this workspace.
pub trait Derivable: Clone + Ord {
    fn derive(&self, ctx: &Ctx) -> BTreeMap<StateId, Self>;
    fn merge(items: Vec<Self>) -> Self;
}

impl Derivable for KRESet {
    fn derive(&self, ctx: &Ctx) -> BTreeMap<StateId, Self> {
        let cells = derive_reduce(self, &ctx.all_states);
        let mut map = BTreeMap::new();
        for (label, value) in cells {
            for s in label {
                map.insert(s, value.clone());
            }
        }
        map
    }

    fn merge(items: Vec<Self>) -> Self {
        let mut out = KRESet::new();
        for item in items {
            out.extend(item);
        }
        out
    }
}

/// Memoizes `Derivable::derive` for a value type `D` (§4.F, §8 "Round-trip
/// / idempotence": deriving the same value twice returns identical
/// transitions).
pub struct Cache<D: Derivable> {
    entries: RefCell<BTreeMap<D, BTreeMap<StateId, D>>>,
}

impl<D: Derivable> Cache<D> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn derive(&self, ctx: &Ctx, value: &D) -> BTreeMap<StateId, D> {
        if let Some(cached) = self.entries.borrow().get(value) {
            return cached.clone();
        }
        let computed = value.derive(ctx);
        self.entries
            .borrow_mut()
            .insert(value.clone(), computed.clone());
        computed
    }
}

impl<D: Derivable> Default for Cache<D> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ctx<'g> {
    pub table: &'g Lr1Table,
    pub matcher: ItemMatcher<'g>,
    pub redgraph: Redgraph,
    pub all_states: std::collections::BTreeSet<StateId>,
    kre_cache: Cache<KRESet>,
}

impl<'g> Ctx<'g> {
    pub fn new(table: &'g Lr1Table) -> Result<Self, InternalInvariant> {
        let matcher = ItemMatcher::new(table);
        let redgraph = Redgraph::build(table)?;
        let all_states = table.states().collect();
        Ok(Self {
            table,
            matcher,
            redgraph,
            all_states,
            kre_cache: Cache::new(),
        })
    }

    /// Cached one-step derivative of a `KRESet`, indexed by the state
    /// consumed (§9 "Caching layer").
    pub fn derive_kre_set(&self, value: &KRESet) -> BTreeMap<StateId, KRESet> {
        self.kre_cache.derive(self, value)
    }
}
