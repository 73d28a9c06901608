// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Component G: the combined state (`ST`) and the worklist-driven DFA
//! construction over it (§4.G). An `ST` pairs a set of direct clause
//! continuations with a set of reduce-simulator instances; deriving one
//! produces the accepted clauses at that state plus a partition-refined
//! list of outgoing transitions to further `ST`s.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::Ctx;
use crate::partition::partition_refine;
use crate::pattern::{prederive_set, Prederived, KRESet};
use crate::reduce::{self, Red};
use crate::grammar::StateId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ST {
    pub direct: KRESet,
    pub reduce: BTreeSet<Red>,
}

type ReductionResult = (Vec<(BTreeSet<StateId>, KRESet)>, Vec<(BTreeSet<StateId>, Red)>);

/// One derivation step of an `ST` (§4.G `derive(st)`): the accepted
/// clauses at this state, and a partition-refined list of `(label, ST')`
/// transitions.
fn derive_st(
    ctx: &Ctx,
    st: &ST,
    reduction_cache: &mut BTreeMap<KRESet, ReductionResult>,
) -> (BTreeSet<usize>, Vec<(BTreeSet<StateId>, ST)>) {
    let Prederived {
        reached,
        direct,
        reduce: requested,
    } = prederive_set(&st.direct);

    let mut transitions: Vec<(BTreeSet<StateId>, ST)> = Vec::new();

    for (label, k) in direct {
        transitions.push((
            label,
            ST {
                direct: std::iter::once(k).collect(),
                reduce: BTreeSet::new(),
            },
        ));
    }

    if !requested.is_empty() {
        let (red_direct, red_reducible) = reduction_cache
            .entry(requested.clone())
            .or_insert_with(|| reduce::initial(ctx, &requested))
            .clone();
        for (label, kset) in red_direct {
            transitions.push((
                label,
                ST {
                    direct: kset,
                    reduce: BTreeSet::new(),
                },
            ));
        }
        for (label, red) in red_reducible {
            transitions.push((
                label,
                ST {
                    direct: KRESet::new(),
                    reduce: std::iter::once(red).collect(),
                },
            ));
        }
    }

    for r in &st.reduce {
        let (r_direct, r_reducible) = reduce::derive(ctx, r);
        for (label, kset) in r_direct {
            transitions.push((
                label,
                ST {
                    direct: kset,
                    reduce: BTreeSet::new(),
                },
            ));
        }
        for (label, red) in r_reducible {
            transitions.push((
                label,
                ST {
                    direct: KRESet::new(),
                    reduce: std::iter::once(red).collect(),
                },
            ));
        }
    }

    let merged = partition_refine(transitions, merge_sts);
    (reached, merged)
}

fn merge_sts(a: ST, b: ST) -> ST {
    let mut direct = a.direct;
    direct.extend(b.direct);
    let mut reduce = a.reduce;
    reduce.extend(b.reduce);
    ST { direct, reduce }
}

/// The compiled recognizer: an array of `ST`s, each with an accept slot
/// (the lowest-index matching clause, if any) and an outgoing transition
/// list partitioned by disjoint label.
#[derive(Debug)]
pub struct Dfa {
    pub states: Vec<ST>,
    pub transitions: Vec<Vec<(BTreeSet<StateId>, usize)>>,
    pub accept: Vec<Option<usize>>,
}

impl Dfa {
    pub fn num_states(&self) -> usize {
        self.states.len()
    }
}

/// Builds the DFA for a rule's entry `KRESet` (§4.G "DFA construction").
pub fn build(ctx: &Ctx, entry: KRESet) -> Dfa {
    let mut states = Vec::new();
    let mut index: BTreeMap<ST, usize> = BTreeMap::new();
    let mut transitions: Vec<Vec<(BTreeSet<StateId>, usize)>> = Vec::new();
    let mut accept: Vec<Option<usize>> = Vec::new();
    let mut reduction_cache: BTreeMap<KRESet, ReductionResult> = BTreeMap::new();

    let start = ST {
        direct: entry,
        reduce: BTreeSet::new(),
    };
    index.insert(start.clone(), 0);
    states.push(start);
    transitions.push(Vec::new());
    accept.push(None);

    let mut worklist = vec![0usize];
    while let Some(idx) = worklist.pop() {
        let st = states[idx].clone();
        let (reached, outs) = derive_st(ctx, &st, &mut reduction_cache);
        accept[idx] = reached.into_iter().min();
        for (label, target_st) in outs {
            let target_idx = match index.get(&target_st) {
                Some(&i) => i,
                None => {
                    let i = states.len();
                    index.insert(target_st.clone(), i);
                    states.push(target_st);
                    transitions.push(Vec::new());
                    accept.push(None);
                    worklist.push(i);
                    i
                }
            };
            transitions[idx].push((label, target_idx));
        }
    }

    Dfa {
        states,
        transitions,
        accept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::resolve::{ResolvedClause, ResolvedPattern};
    use crate::dsl::ast::{Action, Span};
    use crate::grammar::{Lr1Table, RawProduction, RawProductionKind, RawState, RawSymbol, RawTable};
    use crate::item_matcher::ItemMatcher;
    use crate::pattern::kre_list;

    // S -> A ; A -> 'a'. One shift state (1) on the entry symbol A, one
    // state (2) with incoming 'a' that reduces A -> a.
    fn tiny_table() -> Lr1Table {
        let raw = RawTable {
            num_terminals: 1,
            num_nonterminals: 2,
            terminal_names: vec!["a".to_string()],
            nonterminal_names: vec!["S".to_string(), "A".to_string()],
            productions: vec![
                RawProduction {
                    lhs: 0,
                    rhs: vec![RawSymbol::N { id: 1 }],
                    kind: RawProductionKind::Start,
                },
                RawProduction {
                    lhs: 1,
                    rhs: vec![RawSymbol::T { id: 0 }],
                    kind: RawProductionKind::Regular,
                },
            ],
            states: vec![
                RawState {
                    incoming: None,
                    items: vec![(0, 0), (1, 0)],
                    reductions: vec![],
                    transitions: vec![(RawSymbol::N { id: 1 }, 1), (RawSymbol::T { id: 0 }, 2)],
                },
                RawState {
                    incoming: Some(RawSymbol::N { id: 1 }),
                    items: vec![(0, 1)],
                    reductions: vec![],
                    transitions: vec![],
                },
                RawState {
                    incoming: Some(RawSymbol::T { id: 0 }),
                    items: vec![(1, 1)],
                    reductions: vec![(0, vec![1])],
                    transitions: vec![],
                },
            ],
        };
        Lr1Table::from_raw(raw).unwrap()
    }

    fn span() -> Span {
        Span::new("test")
    }

    #[test]
    fn scenario_one_symbol_pattern_accepts_on_its_states() {
        let table = tiny_table();
        let ctx = Ctx::new(&table).unwrap();
        let matcher = ItemMatcher::new(&table);
        let states = matcher.states_of_symbol(&crate::grammar::Symbol::Terminal(crate::grammar::TermId(0)));

        let clauses = vec![ResolvedClause {
            pattern: ResolvedPattern::States(states.clone()),
            action: Action::Code {
                text: "act1".to_string(),
                partial: false,
            },
            span: span(),
        }];
        let entry = kre_list(&clauses);
        let dfa = build(&ctx, entry);

        assert_eq!(dfa.accept[0], None);
        let outs = &dfa.transitions[0];
        assert_eq!(outs.len(), 1);
        let (label, target) = &outs[0];
        assert_eq!(label, &states);
        assert_eq!(dfa.accept[*target], Some(0));
    }

    #[test]
    fn scenario_four_overlapping_clauses_prefer_first() {
        let table = tiny_table();
        let ctx = Ctx::new(&table).unwrap();
        let matcher = ItemMatcher::new(&table);
        let states = matcher.states_of_symbol(&crate::grammar::Symbol::Terminal(crate::grammar::TermId(0)));

        let clauses = vec![
            ResolvedClause {
                pattern: ResolvedPattern::States(states.clone()),
                action: Action::Code { text: "a1".to_string(), partial: false },
                span: span(),
            },
            ResolvedClause {
                pattern: ResolvedPattern::States(states.clone()),
                action: Action::Code { text: "a2".to_string(), partial: false },
                span: span(),
            },
        ];
        let entry = kre_list(&clauses);
        let dfa = build(&ctx, entry);
        let (_, target) = dfa.transitions[0][0];
        assert_eq!(dfa.accept[target], Some(0));
    }

    #[test]
    fn empty_entry_accepts_nothing() {
        let table = tiny_table();
        let ctx = Ctx::new(&table).unwrap();
        let dfa = build(&ctx, KRESet::new());
        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.accept[0], None);
        assert!(dfa.transitions[0].is_empty());
    }

    #[test]
    fn transitions_are_pairwise_disjoint_and_deterministic() {
        let table = tiny_table();
        let ctx = Ctx::new(&table).unwrap();
        let matcher = ItemMatcher::new(&table);
        let a_states = matcher.states_of_symbol(&crate::grammar::Symbol::NonTerminal(crate::grammar::NonTermId(1)));
        let t_states = matcher.states_of_symbol(&crate::grammar::Symbol::Terminal(crate::grammar::TermId(0)));

        let clauses = vec![
            ResolvedClause {
                pattern: ResolvedPattern::States(a_states),
                action: Action::Code { text: "x".to_string(), partial: false },
                span: span(),
            },
            ResolvedClause {
                pattern: ResolvedPattern::States(t_states),
                action: Action::Code { text: "y".to_string(), partial: false },
                span: span(),
            },
        ];
        let entry = kre_list(&clauses);
        let dfa = build(&ctx, entry);
        for outs in &dfa.transitions {
            for i in 0..outs.len() {
                for j in (i + 1)..outs.len() {
                    assert!(outs[i].0.is_disjoint(&outs[j].0));
                }
            }
        }
    }

    #[test]
    fn star_over_empty_language_behaves_as_empty_sequence() {
        let table = tiny_table();
        let ctx = Ctx::new(&table).unwrap();
        let clauses = vec![ResolvedClause {
            pattern: ResolvedPattern::Star(Box::new(ResolvedPattern::States(BTreeSet::new()))),
            action: Action::Code { text: "x".to_string(), partial: false },
            span: span(),
        }];
        let entry = kre_list(&clauses);
        let dfa = build(&ctx, entry);
        // Star over an empty set can never consume anything; the only
        // reachable behaviour is the zero-repetitions (skip) branch, which
        // accepts immediately at the start state.
        assert_eq!(dfa.accept[0], Some(0));
        assert!(dfa.transitions[0].is_empty());
    }
}
