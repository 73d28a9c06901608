// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Component B: selecting LR(1) states by incoming symbol, or by an item
//! template `[lhs: prefix . suffix]` (§4.B).

use std::collections::{BTreeMap, BTreeSet};

use crate::grammar::{Lr1Table, NonTermId, StateId, Symbol};

pub struct ItemMatcher<'g> {
    table: &'g Lr1Table,
    states_of_symbol: BTreeMap<Symbol, BTreeSet<StateId>>,
}

impl<'g> ItemMatcher<'g> {
    pub fn new(table: &'g Lr1Table) -> Self {
        let mut states_of_symbol: BTreeMap<Symbol, BTreeSet<StateId>> = BTreeMap::new();
        for s in table.states() {
            if let Some(symbol) = table.incoming(s) {
                states_of_symbol.entry(symbol).or_default().insert(s);
            }
        }
        Self {
            table,
            states_of_symbol,
        }
    }

    pub fn states_of_symbol(&self, symbol: &Symbol) -> BTreeSet<StateId> {
        self.states_of_symbol
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    /// States having some item `(p, pos)` such that: `lhs` (if given)
    /// matches `lhs(p)`; `pos` is large enough to fit `prefix` before it
    /// and `suffix` after it within `rhs(p)`; and each element of `prefix`
    /// (aligned immediately before the dot, nearest first) and `suffix`
    /// (aligned immediately after the dot) is either a wildcard (`None`)
    /// or equal to the corresponding RHS symbol.
    pub fn states_by_items(
        &self,
        lhs: Option<NonTermId>,
        prefix: &[Option<Symbol>],
        suffix: &[Option<Symbol>],
    ) -> BTreeSet<StateId> {
        let mut result = BTreeSet::new();
        for s in self.table.states() {
            for (p, pos) in self.table.items(s) {
                let production = self.table.production(*p);
                if let Some(lhs) = lhs {
                    if production.lhs != lhs {
                        continue;
                    }
                }
                if *pos < prefix.len() {
                    continue;
                }
                if production.rhs.len() < pos + suffix.len() {
                    continue;
                }
                let prefix_ok = prefix.iter().enumerate().all(|(i, expected)| {
                    let rhs_index = pos - 1 - i;
                    matches_template(expected, production.rhs[rhs_index])
                });
                if !prefix_ok {
                    continue;
                }
                let suffix_ok = suffix.iter().enumerate().all(|(i, expected)| {
                    let rhs_index = pos + i;
                    matches_template(expected, production.rhs[rhs_index])
                });
                if !suffix_ok {
                    continue;
                }
                result.insert(s);
                break;
            }
        }
        result
    }
}

fn matches_template(expected: &Option<Symbol>, actual: Symbol) -> bool {
    match expected {
        None => true,
        Some(sym) => *sym == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{RawProduction, RawState, RawSymbol, RawTable, TermId};

    // E -> E '+' E | 'n'; one state with item [E: E + . E]
    fn table() -> Lr1Table {
        let raw = RawTable {
            num_terminals: 2,
            num_nonterminals: 1,
            terminal_names: vec!["PLUS".to_string(), "n".to_string()],
            nonterminal_names: vec!["E".to_string()],
            productions: vec![
                RawProduction {
                    lhs: 0,
                    rhs: vec![
                        RawSymbol::N { id: 0 },
                        RawSymbol::T { id: 0 },
                        RawSymbol::N { id: 0 },
                    ],
                    kind: crate::grammar::RawProductionKind::Regular,
                },
                RawProduction {
                    lhs: 0,
                    rhs: vec![RawSymbol::T { id: 1 }],
                    kind: crate::grammar::RawProductionKind::Regular,
                },
            ],
            states: vec![RawState {
                incoming: Some(RawSymbol::N { id: 0 }),
                items: vec![(0, 2)],
                reductions: vec![],
                transitions: vec![],
            }],
        };
        Lr1Table::from_raw(raw).unwrap()
    }

    #[test]
    fn states_of_symbol_scans_incoming() {
        let table = table();
        let matcher = ItemMatcher::new(&table);
        let states = matcher.states_of_symbol(&Symbol::NonTerminal(NonTermId(0)));
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn states_by_items_matches_template() {
        let table = table();
        let matcher = ItemMatcher::new(&table);
        let e = Symbol::NonTerminal(NonTermId(0));
        let plus = Symbol::Terminal(TermId(0));
        let states = matcher.states_by_items(Some(NonTermId(0)), &[Some(e), Some(plus)], &[Some(e)]);
        assert_eq!(states.len(), 1);

        let states = matcher.states_by_items(Some(NonTermId(0)), &[None, Some(plus)], &[None]);
        assert_eq!(states.len(), 1);

        let wrong_lhs = matcher.states_by_items(Some(NonTermId(99)), &[], &[]);
        assert!(wrong_lhs.is_empty());
    }
}
