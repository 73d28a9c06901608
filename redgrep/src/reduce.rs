// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Component F: the reduce simulator. Lifts a `KRESet` into an object
//! (`Red`) that walks the reduction graph, producing the direct
//! transitions and further-reducible transitions reachable by simulating
//! zero or more reductions from the current stack top (§4.F).

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::context::{Ctx, Derivable};
use crate::grammar::{NonTermId, StateId};
use crate::pattern::KRESet;
use crate::redgraph::{AbsId, Redgraph};

/// A reduce-simulator instance: `derivations` is the per-state
/// continuation table computed once by [`initial_derivations`], and
/// `state` is the abstract frame this instance currently sits at. Compared
/// lexicographically by `(state, source)`; `derivations` is a pure
/// function of those two, so it plays no part in comparison (§4.F).
#[derive(Debug, Clone)]
pub struct Red {
    pub source: KRESet,
    pub state: AbsId,
    pub derivations: BTreeMap<StateId, KRESet>,
}

impl PartialEq for Red {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.source == other.source
    }
}

impl Eq for Red {}

impl PartialOrd for Red {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Red {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.state, &self.source).cmp(&(other.state, &other.source))
    }
}

/// `initial_derivations(d)` (§4.F): for every LR(1) state reachable from
/// `d` by some sequence of reductions, the merged one-step derivative of
/// `d` along that path.
pub fn initial_derivations(ctx: &Ctx, d: &KRESet) -> BTreeMap<StateId, KRESet> {
    ctx.redgraph.derive(
        d.clone(),
        |value: &KRESet, s: StateId| ctx.derive_kre_set(value).get(&s).cloned(),
        KRESet::merge,
    )
}

/// `initial(d)` (§4.F): the transitions available before any reduction has
/// been simulated — one direct transition per reachable state, plus one
/// reducible transition per LR(1) state whose `reachable_goto` overlaps
/// the continuation table's domain.
pub fn initial(
    ctx: &Ctx,
    d: &KRESet,
) -> (Vec<(BTreeSet<StateId>, KRESet)>, Vec<(BTreeSet<StateId>, Red)>) {
    let continuations = initial_derivations(ctx, d);
    let direct: Vec<(BTreeSet<StateId>, KRESet)> = continuations
        .iter()
        .map(|(&s, d_s)| (std::iter::once(s).collect(), d_s.clone()))
        .collect();

    let domain: BTreeSet<StateId> = continuations.keys().copied().collect();
    let mut reducible = Vec::new();
    for s in ctx.table.states() {
        let a = Redgraph::of_lr1(s);
        if ctx
            .redgraph
            .reachable_goto(a)
            .intersection(&domain)
            .next()
            .is_some()
        {
            reducible.push((
                std::iter::once(s).collect(),
                Red {
                    source: d.clone(),
                    state: a,
                    derivations: continuations.clone(),
                },
            ));
        }
    }
    (direct, reducible)
}

/// `derive(t)` (§4.F) for an existing reduce-simulator instance: one step
/// further into the reduction graph from `t.state`.
pub fn derive(
    ctx: &Ctx,
    red: &Red,
) -> (Vec<(BTreeSet<StateId>, KRESet)>, Vec<(BTreeSet<StateId>, Red)>) {
    let mut direct = Vec::new();
    let mut reducible = Vec::new();
    let domain: BTreeSet<StateId> = red.derivations.keys().copied().collect();

    if let Some(parent) = ctx.redgraph.parent(red.state) {
        if ctx
            .redgraph
            .reachable_goto(parent)
            .intersection(&domain)
            .next()
            .is_some()
        {
            reducible.push((
                ctx.all_states.clone(),
                Red {
                    source: red.source.clone(),
                    state: parent,
                    derivations: red.derivations.clone(),
                },
            ));
        }
    }

    let mut visited_nt = BTreeSet::new();
    walk(
        ctx,
        red,
        red.state,
        &domain,
        &mut visited_nt,
        &mut direct,
        &mut reducible,
    );

    (direct, reducible)
}

fn walk(
    ctx: &Ctx,
    red: &Red,
    a: AbsId,
    domain: &BTreeSet<StateId>,
    visited_nt: &mut BTreeSet<NonTermId>,
    direct: &mut Vec<(BTreeSet<StateId>, KRESet)>,
    reducible: &mut Vec<(BTreeSet<StateId>, Red)>,
) {
    let goto_nt: Vec<NonTermId> = ctx.redgraph.goto_nt(a).iter().copied().collect();
    let sources: Vec<StateId> = ctx.redgraph.states(a).iter().copied().collect();

    for nt in goto_nt {
        if !visited_nt.insert(nt) {
            continue;
        }
        let mut by_target: BTreeMap<StateId, BTreeSet<StateId>> = BTreeMap::new();
        for &src in &sources {
            if let Some(g) = ctx.table.find_goto(src, nt) {
                let tgt = ctx.table.goto_target(g);
                by_target.entry(tgt).or_default().insert(src);
            }
        }

        for (tgt, srcs) in by_target {
            if let Some(cont) = red.derivations.get(&tgt) {
                let derived_map = ctx.derive_kre_set(cont);
                let mut groups: BTreeMap<KRESet, BTreeSet<StateId>> = BTreeMap::new();
                for (s2, v2) in derived_map {
                    if srcs.contains(&s2) {
                        groups.entry(v2).or_default().insert(s2);
                    }
                }
                for (value, label) in groups {
                    direct.push((label, value));
                }
            }

            let tgt_abs = Redgraph::of_lr1(tgt);
            if ctx
                .redgraph
                .reachable_goto(tgt_abs)
                .intersection(domain)
                .next()
                .is_some()
            {
                reducible.push((
                    srcs.clone(),
                    Red {
                        source: red.source.clone(),
                        state: tgt_abs,
                        derivations: red.derivations.clone(),
                    },
                ));
            }

            walk(ctx, red, tgt_abs, domain, visited_nt, direct, reducible);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Lr1Table, RawProduction, RawProductionKind, RawState, RawSymbol, RawTable};
    use crate::pattern::{RE, KRE};

    // E -> E '+' E | 'n'. State 3 has incoming 'n' and reduces E -> n.
    fn expr_table() -> Lr1Table {
        let raw = RawTable {
            num_terminals: 2,
            num_nonterminals: 1,
            terminal_names: vec!["PLUS".to_string(), "n".to_string()],
            nonterminal_names: vec!["E".to_string()],
            productions: vec![
                RawProduction {
                    lhs: 0,
                    rhs: vec![RawSymbol::N { id: 0 }, RawSymbol::T { id: 0 }, RawSymbol::N { id: 0 }],
                    kind: RawProductionKind::Regular,
                },
                RawProduction {
                    lhs: 0,
                    rhs: vec![RawSymbol::T { id: 1 }],
                    kind: RawProductionKind::Regular,
                },
            ],
            states: vec![
                RawState {
                    incoming: None,
                    items: vec![(0, 0), (1, 0)],
                    reductions: vec![],
                    transitions: vec![(RawSymbol::N { id: 0 }, 1), (RawSymbol::T { id: 1 }, 3)],
                },
                RawState {
                    incoming: Some(RawSymbol::N { id: 0 }),
                    items: vec![(0, 1)],
                    reductions: vec![],
                    transitions: vec![(RawSymbol::T { id: 0 }, 2)],
                },
                RawState {
                    incoming: Some(RawSymbol::T { id: 0 }),
                    items: vec![(0, 2)],
                    reductions: vec![],
                    transitions: vec![(RawSymbol::N { id: 0 }, 1)],
                },
                RawState {
                    incoming: Some(RawSymbol::T { id: 1 }),
                    items: vec![(1, 1)],
                    reductions: vec![(0, vec![1]), (1, vec![1])],
                    transitions: vec![],
                },
            ],
        };
        Lr1Table::from_raw(raw).unwrap()
    }

    #[test]
    fn initial_derivations_covers_states_reached_by_reduction() {
        let table = expr_table();
        let ctx = Ctx::new(&table).unwrap();
        let k = KRE::More(
            RE::Set(std::iter::once(StateId(1)).collect(), None),
            Box::new(KRE::Done(0)),
        );
        let d: KRESet = std::iter::once(k).collect();
        let derivations = initial_derivations(&ctx, &d);
        assert!(derivations.contains_key(&StateId(3)));
    }

    #[test]
    fn red_ordering_ignores_derivations_field() {
        let table = expr_table();
        let ctx = Ctx::new(&table).unwrap();
        let d: KRESet = std::iter::once(KRE::Done(0)).collect();
        let (_, reducible) = initial(&ctx, &d);
        if reducible.len() >= 2 {
            let (_, r0) = &reducible[0];
            let (_, r1) = &reducible[1];
            if r0.state == r1.state && r0.source == r1.source {
                assert_eq!(r0, r1);
            }
        }
    }
}
