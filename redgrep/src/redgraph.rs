// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Component C: the reduction graph (§4.C). A static analysis over the
//! LR(1) automaton that enumerates every stack suffix reachable by applying
//! any sequence of reductions from any state, represented as a tree of
//! concrete (known-prefix) frames per state plus a DAG of abstract
//! (set-of-predecessors) frames shared once the concrete prefix runs out,
//! with a derivation trie recording which suffixes are reachable from which
//! originating states.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::InternalInvariant;
use crate::grammar::{Lr1Table, NonTermId, StateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbsId(pub u32);

impl AbsId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AbsId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AbsId{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ConcreteIdx(u32);

impl ConcreteIdx {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TrieIdx(u32);

impl TrieIdx {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Concrete(ConcreteIdx),
    Abstract(AbsId),
}

#[derive(Debug, Clone)]
struct ConcreteFrame {
    state: StateId,
    goto: BTreeMap<StateId, ConcreteIdx>,
    parent: Option<ConcreteIdx>,
}

#[derive(Debug, Clone)]
struct AbstractFrame {
    states: BTreeSet<StateId>,
    goto_nt: BTreeSet<NonTermId>,
    parent: Option<AbsId>,
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<StateId, TrieIdx>,
    goto_targets: BTreeSet<StateId>,
}

/// `Redgraph`, built once from a loaded [`Lr1Table`] and immutable
/// thereafter (§3 "Lifecycle").
#[derive(Debug)]
pub struct Redgraph {
    concrete: Vec<ConcreteFrame>,
    concrete_roots: Vec<ConcreteIdx>,
    abstract_frames: Vec<AbstractFrame>,
    trie: Vec<TrieNode>,
    trie_root: TrieIdx,
    goto_closure: Vec<Vec<(BTreeSet<StateId>, BTreeSet<StateId>)>>,
    reachable_goto: Vec<BTreeSet<StateId>>,
}

impl Redgraph {
    pub fn of_lr1(s: StateId) -> AbsId {
        AbsId(s.0)
    }

    pub fn states(&self, a: AbsId) -> &BTreeSet<StateId> {
        &self.abstract_frames[a.index()].states
    }

    pub fn goto_nt(&self, a: AbsId) -> &BTreeSet<NonTermId> {
        &self.abstract_frames[a.index()].goto_nt
    }

    pub fn parent(&self, a: AbsId) -> Option<AbsId> {
        self.abstract_frames[a.index()].parent
    }

    pub fn reachable_goto(&self, a: AbsId) -> &BTreeSet<StateId> {
        &self.reachable_goto[a.index()]
    }

    pub fn goto_closure(&self, a: AbsId) -> &[(BTreeSet<StateId>, BTreeSet<StateId>)] {
        &self.goto_closure[a.index()]
    }

    pub fn num_abstract_frames(&self) -> usize {
        self.abstract_frames.len()
    }

    /// Builds the reduction graph for `table`: abstract-frame allocation
    /// (phase 1), stack-suffix enumeration (phase 2), derivation-trie
    /// construction (phase 3), then goto closure and reachable-goto
    /// (phase 4).
    pub fn build(table: &Lr1Table) -> Result<Self, InternalInvariant> {
        let num_states = table.num_states();

        // Phase 1: abstract-frame allocation, one `of_lr1(s)` per state.
        let mut abstract_frames = Vec::with_capacity(num_states);
        for s in table.states() {
            abstract_frames.push(AbstractFrame {
                states: table.predecessor_states(s).into_iter().collect(),
                goto_nt: BTreeSet::new(),
                parent: None,
            });
        }

        let mut graph = Redgraph {
            concrete: Vec::new(),
            concrete_roots: vec![ConcreteIdx(0); num_states],
            abstract_frames,
            trie: vec![TrieNode::default()],
            trie_root: TrieIdx(0),
            goto_closure: Vec::new(),
            reachable_goto: Vec::new(),
        };

        // Phase 2: stack-suffix enumeration, one concrete root per state.
        for s0 in table.states() {
            let root = graph.push_concrete(s0, None);
            graph.concrete_roots[s0.index()] = root;
            let mut ancestors = BTreeSet::new();
            ancestors.insert(s0);
            graph.populate(table, root, &mut ancestors)?;
        }

        // Phase 3: derivation trie, one traversal per originating state.
        for s0 in table.states() {
            let root = graph.concrete_roots[s0.index()];
            graph.visit_all_starts(s0, root);
        }

        // Phase 4: goto closure and reachable-goto least fixed point.
        let n = graph.abstract_frames.len();
        graph.goto_closure = (0..n)
            .map(|i| graph.compute_goto_closure(table, AbsId(i as u32)))
            .collect();
        graph.compute_reachable_goto();

        Ok(graph)
    }

    fn push_concrete(&mut self, state: StateId, parent: Option<ConcreteIdx>) -> ConcreteIdx {
        self.concrete.push(ConcreteFrame {
            state,
            goto: BTreeMap::new(),
            parent,
        });
        ConcreteIdx((self.concrete.len() - 1) as u32)
    }

    fn pop(&mut self, table: &Lr1Table, fp: Frame) -> Frame {
        match fp {
            Frame::Concrete(c) => match self.concrete[c.index()].parent {
                Some(p) => Frame::Concrete(p),
                None => Frame::Abstract(Self::of_lr1(self.concrete[c.index()].state)),
            },
            Frame::Abstract(a) => match self.abstract_frames[a.index()].parent {
                Some(p) => Frame::Abstract(p),
                None => Frame::Abstract(self.allocate_abstract_parent(table, a)),
            },
        }
    }

    /// Allocates the (lazily-created) parent of an abstract frame that has
    /// none yet: the union of predecessor sets of its member states.
    fn allocate_abstract_parent(&mut self, table: &Lr1Table, a: AbsId) -> AbsId {
        let states: BTreeSet<StateId> = self.abstract_frames[a.index()]
            .states
            .iter()
            .flat_map(|&s| table.predecessor_states(s))
            .collect();
        let new_id = AbsId(self.abstract_frames.len() as u32);
        self.abstract_frames.push(AbstractFrame {
            states,
            goto_nt: BTreeSet::new(),
            parent: None,
        });
        self.abstract_frames[a.index()].parent = Some(new_id);
        new_id
    }

    /// Recursively populates the subtree rooted at `c`, applying one goto
    /// per reducible nonterminal at each pop-depth (§4.C phase 2). The
    /// `ancestors` set guards against re-entering a state already on the
    /// current root-to-`c` path.
    fn populate(
        &mut self,
        table: &Lr1Table,
        c0: ConcreteIdx,
        ancestors: &mut BTreeSet<StateId>,
    ) -> Result<(), InternalInvariant> {
        let reds = table.reductions_by_depth(self.concrete[c0.index()].state);
        let mut fp = Frame::Concrete(c0);
        for (i, nts) in reds.iter().enumerate() {
            if i > 0 {
                fp = self.pop(table, fp);
            }
            for &nt in nts {
                match fp {
                    Frame::Concrete(c) => {
                        let c_state = self.concrete[c.index()].state;
                        let goto_id = table.find_goto(c_state, nt).ok_or_else(|| {
                            InternalInvariant(format!(
                                "state {} is claimed reducible to nonterminal {} but has no goto",
                                c_state, nt
                            ))
                        })?;
                        let target = table.goto_target(goto_id);
                        if self.concrete[c.index()].goto.contains_key(&target) {
                            continue;
                        }
                        if ancestors.contains(&target) {
                            continue;
                        }
                        let child = self.push_concrete(target, Some(c));
                        self.concrete[c.index()].goto.insert(target, child);
                        ancestors.insert(target);
                        self.populate(table, child, ancestors)?;
                        ancestors.remove(&target);
                    }
                    Frame::Abstract(a) => {
                        self.abstract_frames[a.index()].goto_nt.insert(nt);
                    }
                }
            }
        }
        Ok(())
    }

    fn children_of(&self, c: ConcreteIdx) -> Vec<ConcreteIdx> {
        self.concrete[c.index()].goto.values().copied().collect()
    }

    /// Emits, for every node `c'` in the subtree rooted at `c` (`c`
    /// included), the downward path from `c'` to every one of its own
    /// descendants, tagged with the originating state `s0`.
    fn visit_all_starts(&mut self, s0: StateId, c: ConcreteIdx) {
        let mut path = Vec::new();
        self.emit_downward_paths(s0, c, &mut path);
        for child in self.children_of(c) {
            self.visit_all_starts(s0, child);
        }
    }

    fn emit_downward_paths(&mut self, s0: StateId, c: ConcreteIdx, path: &mut Vec<StateId>) {
        path.push(self.concrete[c.index()].state);
        self.trie_insert_path(path, s0);
        for child in self.children_of(c) {
            self.emit_downward_paths(s0, child, path);
        }
        path.pop();
    }

    fn trie_insert_path(&mut self, path: &[StateId], s0: StateId) {
        let mut node = self.trie_root;
        for &s in path {
            let existing = self.trie[node.index()].children.get(&s).copied();
            node = match existing {
                Some(n) => n,
                None => {
                    self.trie.push(TrieNode::default());
                    let new_idx = TrieIdx((self.trie.len() - 1) as u32);
                    self.trie[node.index()].children.insert(s, new_idx);
                    new_idx
                }
            };
        }
        self.trie[node.index()].goto_targets.insert(s0);
    }

    /// Generic derivation interface (§4.C "Derivation interface"): DFS over
    /// the derivation trie, carrying a value of type `X` per edge via
    /// `step`, accumulating the values reached at each LR(1) state's
    /// trie node, and joining the per-state lists into `Y` via `join`.
    pub fn derive<X, Y>(
        &self,
        root: X,
        step: impl Fn(&X, StateId) -> Option<X>,
        join: impl Fn(Vec<X>) -> Y,
    ) -> BTreeMap<StateId, Y>
    where
        X: Clone,
    {
        let mut acc: BTreeMap<StateId, Vec<X>> = BTreeMap::new();
        self.derive_walk(self.trie_root, &root, &step, &mut acc);
        acc.into_iter().map(|(s, xs)| (s, join(xs))).collect()
    }

    fn derive_walk<X: Clone>(
        &self,
        node: TrieIdx,
        value: &X,
        step: &impl Fn(&X, StateId) -> Option<X>,
        acc: &mut BTreeMap<StateId, Vec<X>>,
    ) {
        for &s in &self.trie[node.index()].goto_targets {
            acc.entry(s).or_default().push(value.clone());
        }
        for (&edge, &child) in &self.trie[node.index()].children {
            if let Some(next) = step(value, edge) {
                self.derive_walk(child, &next, step, acc);
            }
        }
    }

    /// `close(s)`: states reachable from `s` by repeatedly taking a goto
    /// labeled by a nonterminal in `start_nt`, then continuing transitively
    /// using each newly reached state's own `of_lr1(.).goto_nt`.
    fn close(&self, table: &Lr1Table, start_nt: &BTreeSet<NonTermId>, s: StateId) -> BTreeSet<StateId> {
        let mut result = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut frontier = vec![(s, start_nt.clone())];
        while let Some((cur, nts)) = frontier.pop() {
            if !visited.insert(cur) {
                continue;
            }
            for nt in &nts {
                if let Some(g) = table.find_goto(cur, *nt) {
                    let target = table.goto_target(g);
                    result.insert(target);
                    let next_nts = self.abstract_frames[Self::of_lr1(target).index()]
                        .goto_nt
                        .clone();
                    frontier.push((target, next_nts));
                }
            }
        }
        result
    }

    fn compute_goto_closure(
        &self,
        table: &Lr1Table,
        a: AbsId,
    ) -> Vec<(BTreeSet<StateId>, BTreeSet<StateId>)> {
        let af = &self.abstract_frames[a.index()];
        if af.goto_nt.is_empty() {
            return Vec::new();
        }
        let mut groups: BTreeMap<BTreeSet<StateId>, BTreeSet<StateId>> = BTreeMap::new();
        for &s in &af.states {
            let targets = self.close(table, &af.goto_nt, s);
            groups.entry(targets).or_default().insert(s);
        }
        groups.into_iter().map(|(targets, sources)| (sources, targets)).collect()
    }

    fn compute_reachable_goto(&mut self) {
        let n = self.abstract_frames.len();
        self.reachable_goto = vec![BTreeSet::new(); n];
        let mut changed = true;
        while changed {
            changed = false;
            for idx in 0..n {
                let mut new_set = self.reachable_goto[idx].clone();
                for (_, targets) in &self.goto_closure[idx] {
                    for &t in targets {
                        new_set.insert(t);
                        let of_lr1_idx = Self::of_lr1(t).index();
                        for &r in &self.reachable_goto[of_lr1_idx] {
                            new_set.insert(r);
                        }
                    }
                }
                if let Some(parent) = self.abstract_frames[idx].parent {
                    for &r in &self.reachable_goto[parent.index()] {
                        new_set.insert(r);
                    }
                }
                if new_set != self.reachable_goto[idx] {
                    self.reachable_goto[idx] = new_set;
                    changed = true;
                }
            }
        }
    }
}
