// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Components D and E: the pattern IR (`RE`, `KRE`, `KRESet`) translated
//! from the resolved surface syntax, and the single-step Brzozowski
//! derivative (`prederive`/`derive_reduce`) over it (§4.D, §4.E).
//!
//! `RE`/`KRE` compare and hash structurally (`derive(PartialEq, Eq, Ord,
//! Hash)`): two nodes built the same way are the same node (see DESIGN.md).

use std::collections::BTreeSet;

use crate::dsl::resolve::ResolvedPattern;
use crate::grammar::StateId;
use crate::partition::partition_refine;

/// A regular expression over LR(1) states (§3 "Pattern IR").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RE {
    /// A set of states to match the current stack-top state against, with
    /// an optional capture name. The DSL (§6.2) has no surface syntax for
    /// naming a capture, so `translate` always produces `None` here; the
    /// field is retained so a future front end can populate it without
    /// reshaping the IR (§9 "Open questions").
    Set(BTreeSet<StateId>, Option<String>),
    Alt(Vec<RE>),
    Seq(Vec<RE>),
    Star(Box<RE>),
    Reduce,
}

/// A continuation-tagged regular expression: either an accepted clause, or
/// a term to consume followed by a continuation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KRE {
    Done(usize),
    More(RE, Box<KRE>),
}

/// An ordered union of `KRE`s (§3 "Pattern IR").
pub type KRESet = BTreeSet<KRE>;

/// Lowers a resolved pattern tree into `RE` (§4.D).
pub fn translate(pattern: &ResolvedPattern) -> RE {
    match pattern {
        ResolvedPattern::Alt(arms) => RE::Alt(arms.iter().map(translate).collect()),
        ResolvedPattern::Seq(terms) => RE::Seq(terms.iter().map(translate).collect()),
        ResolvedPattern::Star(inner) => RE::Star(Box::new(translate(inner))),
        ResolvedPattern::States(states) => RE::Set(states.clone(), None),
        ResolvedPattern::Reduce => RE::Reduce,
    }
}

/// Builds the entry `KRESet` for a rule: one `More(pattern, Done(i))` per
/// clause, in source order (clause index doubles as match priority, §5).
pub fn kre_list(clauses: &[crate::dsl::resolve::ResolvedClause]) -> KRESet {
    clauses
        .iter()
        .enumerate()
        .map(|(i, clause)| KRE::More(translate(&clause.pattern), Box::new(KRE::Done(i))))
        .collect()
}

/// Result of running `prederive` over every member of a `KRESet`: accepted
/// clauses, raw direct transitions (not yet partition-refined), and the
/// continuations that a `Reduce` atom made available.
pub struct Prederived {
    pub reached: BTreeSet<usize>,
    pub direct: Vec<(BTreeSet<StateId>, KRE)>,
    pub reduce: KRESet,
}

/// Runs `prederive` (§4.E) over every member of `set`, sharing one
/// `visited` guard across the whole set so that a subterm shared between
/// two clauses is expanded only once.
pub fn prederive_set(set: &KRESet) -> Prederived {
    let mut visited = BTreeSet::new();
    let mut reached = BTreeSet::new();
    let mut direct = Vec::new();
    let mut reduce = BTreeSet::new();
    for k in set {
        prederive(k, &mut visited, &mut reached, &mut direct, &mut reduce);
    }
    Prederived {
        reached,
        direct,
        reduce,
    }
}

/// Single-step epsilon closure of one `KRE` (§4.E).
pub fn prederive(
    k: &KRE,
    visited: &mut BTreeSet<KRE>,
    reached: &mut BTreeSet<usize>,
    direct: &mut Vec<(BTreeSet<StateId>, KRE)>,
    reduce: &mut KRESet,
) {
    if !visited.insert(k.clone()) {
        return;
    }
    match k {
        KRE::Done(i) => {
            reached.insert(*i);
        }
        KRE::More(re, cont) => prederive_more(re, cont, k, visited, reached, direct, reduce),
    }
}

fn prederive_more(
    re: &RE,
    cont: &KRE,
    original: &KRE,
    visited: &mut BTreeSet<KRE>,
    reached: &mut BTreeSet<usize>,
    direct: &mut Vec<(BTreeSet<StateId>, KRE)>,
    reduce: &mut KRESet,
) {
    match re {
        RE::Set(states, _capture) => {
            direct.push((states.clone(), cont.clone()));
        }
        RE::Alt(arms) => {
            for r in arms {
                let next = KRE::More(r.clone(), Box::new(cont.clone()));
                prederive(&next, visited, reached, direct, reduce);
            }
        }
        RE::Star(inner) => {
            // Zero occurrences: fall straight through to the continuation.
            prederive(cont, visited, reached, direct, reduce);
            // One or more: match `inner` once, then reconsider the whole
            // `Star` node (so further repetitions remain possible).
            let next = KRE::More((**inner).clone(), Box::new(original.clone()));
            prederive(&next, visited, reached, direct, reduce);
        }
        RE::Seq(terms) => {
            let folded = terms
                .iter()
                .rev()
                .fold(cont.clone(), |acc, r| KRE::More(r.clone(), Box::new(acc)));
            prederive(&folded, visited, reached, direct, reduce);
        }
        RE::Reduce => {
            // The reduction is optional: the continuation may also match
            // directly at the current stack position.
            reduce.insert(cont.clone());
            prederive(cont, visited, reached, direct, reduce);
        }
    }
}

/// `derive_reduce(T)` (§4.E): single-step derivative of a `KRESet` used as
/// input to the reduce simulator (component F). Accepted clauses are
/// turned into pseudo-transitions labeled with every state in
/// `all_states`, so that they end up merged into every partition cell;
/// `Reduce` requests collected along the way are discarded here — the
/// caller (the reduce simulator) computes and owns those separately.
pub fn derive_reduce(set: &KRESet, all_states: &BTreeSet<StateId>) -> Vec<(BTreeSet<StateId>, KRESet)> {
    let Prederived { reached, direct, .. } = prederive_set(set);

    let mut items: Vec<(BTreeSet<StateId>, KRESet)> = direct
        .into_iter()
        .map(|(label, k)| (label, std::iter::once(k).collect()))
        .collect();
    for i in reached {
        items.push((all_states.clone(), std::iter::once(KRE::Done(i)).collect()));
    }

    partition_refine(items, |mut a: KRESet, b: KRESet| {
        a.extend(b);
        a
    })
}
