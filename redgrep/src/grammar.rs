// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! The grammar view: a typed, index-based wrapper over the terminals,
//! nonterminals, productions, LR(1) states and transitions of a compiled
//! LR(1) automaton (component A).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

macro_rules! index_universe {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", stringify!($name), self.0)
            }
        }
    };
}

index_universe!(TermId);
index_universe!(NonTermId);
index_universe!(ProdId);
index_universe!(StateId);
index_universe!(GotoId);
index_universe!(ShiftId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Terminal(TermId),
    NonTerminal(NonTermId),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Symbol::Terminal(t) => write!(f, "T{}", t.0),
            Symbol::NonTerminal(n) => write!(f, "N{}", n.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionKind {
    Start,
    Regular,
}

/// A single reachable-in-one-step transition out of a state: either a
/// `goto` (taken after a reduction, labeled by a nonterminal) or a `shift`
/// (taken on input, labeled by a terminal). `Any = G ⊎ H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnyId {
    Goto(GotoId),
    Shift(ShiftId),
}

#[derive(Debug, Clone)]
pub struct Production {
    pub lhs: NonTermId,
    pub rhs: Vec<Symbol>,
    pub kind: ProductionKind,
}

#[derive(Debug, Clone, Default)]
pub struct StateData {
    pub incoming: Option<Symbol>,
    pub items: Vec<(ProdId, usize)>,
    /// `(lookahead terminal, productions reducible under it)`, as delivered
    /// by the loader. `reductions_by_depth` below unions these across
    /// lookaheads and buckets them by RHS length.
    pub raw_reductions: Vec<(TermId, Vec<ProdId>)>,
    pub successors: Vec<AnyId>,
    pub predecessors: Vec<AnyId>,
}

#[derive(Debug, Clone)]
struct GotoTransition {
    source: StateId,
    target: StateId,
    symbol: NonTermId,
}

#[derive(Debug, Clone)]
struct ShiftTransition {
    source: StateId,
    target: StateId,
    symbol: TermId,
}

/// Read-only wrapper over a compiled LR(1) automaton (§6.1). Built once at
/// startup from the raw, serialized table and immutable thereafter.
#[derive(Debug)]
pub struct Lr1Table {
    num_terminals: u32,
    num_nonterminals: u32,
    productions: Vec<Production>,
    states: Vec<StateData>,
    gotos: Vec<GotoTransition>,
    shifts: Vec<ShiftTransition>,
    goto_index: BTreeMap<(StateId, NonTermId), GotoId>,
    terminal_names: Vec<String>,
    nonterminal_names: Vec<String>,
    terminal_by_name: BTreeMap<String, TermId>,
    nonterminal_by_name: BTreeMap<String, NonTermId>,
}

impl Lr1Table {
    pub fn num_terminals(&self) -> u32 {
        self.num_terminals
    }

    pub fn num_nonterminals(&self) -> u32 {
        self.num_nonterminals
    }

    pub fn num_productions(&self) -> usize {
        self.productions.len()
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len() as u32).map(StateId)
    }

    pub fn production(&self, p: ProdId) -> &Production {
        &self.productions[p.index()]
    }

    pub fn incoming(&self, s: StateId) -> Option<Symbol> {
        self.states[s.index()].incoming
    }

    pub fn items(&self, s: StateId) -> &[(ProdId, usize)] {
        &self.states[s.index()].items
    }

    pub fn successors(&self, s: StateId) -> &[AnyId] {
        &self.states[s.index()].successors
    }

    pub fn predecessors(&self, s: StateId) -> &[AnyId] {
        &self.states[s.index()].predecessors
    }

    pub fn predecessor_states(&self, s: StateId) -> Vec<StateId> {
        self.predecessors(s).iter().map(|a| self.source(*a)).collect()
    }

    pub fn source(&self, any: AnyId) -> StateId {
        match any {
            AnyId::Goto(g) => self.gotos[g.index()].source,
            AnyId::Shift(h) => self.shifts[h.index()].source,
        }
    }

    pub fn target(&self, any: AnyId) -> StateId {
        match any {
            AnyId::Goto(g) => self.gotos[g.index()].target,
            AnyId::Shift(h) => self.shifts[h.index()].target,
        }
    }

    pub fn symbol(&self, any: AnyId) -> Symbol {
        match any {
            AnyId::Goto(g) => Symbol::NonTerminal(self.gotos[g.index()].symbol),
            AnyId::Shift(h) => Symbol::Terminal(self.shifts[h.index()].symbol),
        }
    }

    pub fn find_goto(&self, s: StateId, nt: NonTermId) -> Option<GotoId> {
        self.goto_index.get(&(s, nt)).copied()
    }

    pub fn terminal_name(&self, t: TermId) -> &str {
        &self.terminal_names[t.index()]
    }

    pub fn nonterminal_name(&self, n: NonTermId) -> &str {
        &self.nonterminal_names[n.index()]
    }

    pub fn terminal_named(&self, name: &str) -> Option<TermId> {
        self.terminal_by_name.get(name).copied()
    }

    pub fn nonterminal_named(&self, name: &str) -> Option<NonTermId> {
        self.nonterminal_by_name.get(name).copied()
    }

    /// Resolves `name` against both tables; nonterminals shadow terminals
    /// on a name collision, mirroring ordinary grammar-symbol lookup.
    pub fn symbol_named(&self, name: &str) -> Option<Symbol> {
        self.nonterminal_named(name)
            .map(Symbol::NonTerminal)
            .or_else(|| self.terminal_named(name).map(Symbol::Terminal))
    }

    pub fn goto_target(&self, g: GotoId) -> StateId {
        self.gotos[g.index()].target
    }

    /// `reductions(s)`: an array whose index `d` holds the set of
    /// nonterminals `lhs(p)` for (non-start) productions with `|rhs(p)| = d`
    /// that are reducible in `s`, deduplicated across lookaheads (§4.A).
    /// Built from the state's reductions list, not its item set.
    pub fn reductions_by_depth(&self, s: StateId) -> Vec<std::collections::BTreeSet<NonTermId>> {
        let mut by_depth: Vec<std::collections::BTreeSet<NonTermId>> = Vec::new();
        for (_lookahead, prods) in self.states[s.index()].raw_reductions.iter() {
            for &p in prods {
                let production = self.production(p);
                if matches!(production.kind, ProductionKind::Start) {
                    continue;
                }
                let depth = production.rhs.len();
                if by_depth.len() <= depth {
                    by_depth.resize_with(depth + 1, std::collections::BTreeSet::new);
                }
                by_depth[depth].insert(production.lhs);
            }
        }
        by_depth
    }
}

// --- Loading -----------------------------------------------------------

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "kind")]
pub enum RawSymbol {
    T { id: u32 },
    N { id: u32 },
}

#[derive(Debug, Deserialize, Serialize)]
pub enum RawProductionKind {
    Start,
    Regular,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawProduction {
    pub lhs: u32,
    pub rhs: Vec<RawSymbol>,
    pub kind: RawProductionKind,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawState {
    pub incoming: Option<RawSymbol>,
    pub items: Vec<(u32, usize)>,
    pub reductions: Vec<(u32, Vec<u32>)>,
    pub transitions: Vec<(RawSymbol, u32)>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawTable {
    pub num_terminals: u32,
    pub num_nonterminals: u32,
    pub terminal_names: Vec<String>,
    pub nonterminal_names: Vec<String>,
    pub productions: Vec<RawProduction>,
    pub states: Vec<RawState>,
}

impl RawTable {
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, ConfigError> {
        serde_json::from_reader(reader).map_err(ConfigError::MalformedGrammarTable)
    }
}

fn symbol_from_raw(raw: &RawSymbol) -> Symbol {
    match raw {
        RawSymbol::T { id } => Symbol::Terminal(TermId(*id)),
        RawSymbol::N { id } => Symbol::NonTerminal(NonTermId(*id)),
    }
}

impl Lr1Table {
    pub fn from_raw(raw: RawTable) -> Result<Self, ConfigError> {
        let productions: Vec<Production> = raw
            .productions
            .iter()
            .map(|p| Production {
                lhs: NonTermId(p.lhs),
                rhs: p.rhs.iter().map(symbol_from_raw).collect(),
                kind: match p.kind {
                    RawProductionKind::Start => ProductionKind::Start,
                    RawProductionKind::Regular => ProductionKind::Regular,
                },
            })
            .collect();

        let mut states: Vec<StateData> = raw
            .states
            .iter()
            .map(|s| StateData {
                incoming: s.incoming.as_ref().map(symbol_from_raw),
                items: s
                    .items
                    .iter()
                    .map(|(p, pos)| (ProdId(*p), *pos))
                    .collect(),
                raw_reductions: s
                    .reductions
                    .iter()
                    .map(|(t, ps)| (TermId(*t), ps.iter().map(|p| ProdId(*p)).collect()))
                    .collect(),
                successors: Vec::new(),
                predecessors: Vec::new(),
            })
            .collect();

        let mut gotos = Vec::new();
        let mut shifts = Vec::new();
        let mut goto_index = BTreeMap::new();

        for (source_idx, raw_state) in raw.states.iter().enumerate() {
            let source = StateId(source_idx as u32);
            for (raw_symbol, target) in raw_state.transitions.iter() {
                let target = StateId(*target);
                match symbol_from_raw(raw_symbol) {
                    Symbol::NonTerminal(nt) => {
                        let id = GotoId(gotos.len() as u32);
                        gotos.push(GotoTransition {
                            source,
                            target,
                            symbol: nt,
                        });
                        goto_index.insert((source, nt), id);
                    }
                    Symbol::Terminal(t) => {
                        let id = ShiftId(shifts.len() as u32);
                        shifts.push(ShiftTransition {
                            source,
                            target,
                            symbol: t,
                        });
                    }
                }
            }
        }

        for (id, g) in gotos.iter().enumerate() {
            let any = AnyId::Goto(GotoId(id as u32));
            states[g.source.index()].successors.push(any);
            states[g.target.index()].predecessors.push(any);
        }
        for (id, h) in shifts.iter().enumerate() {
            let any = AnyId::Shift(ShiftId(id as u32));
            states[h.source.index()].successors.push(any);
            states[h.target.index()].predecessors.push(any);
        }

        let terminal_by_name = raw
            .terminal_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), TermId(i as u32)))
            .collect();
        let nonterminal_by_name = raw
            .nonterminal_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), NonTermId(i as u32)))
            .collect();

        Ok(Self {
            num_terminals: raw.num_terminals,
            num_nonterminals: raw.num_nonterminals,
            productions,
            states,
            gotos,
            shifts,
            goto_index,
            terminal_names: raw.terminal_names,
            nonterminal_names: raw.nonterminal_names,
            terminal_by_name,
            nonterminal_by_name,
        })
    }

    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)
            .map_err(|e| ConfigError::UnreadablePath(path.to_path_buf(), e))?;
        let raw = RawTable::from_reader(std::io::BufReader::new(file))?;
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_table() -> Lr1Table {
        // S -> A ; A -> 'a'  (one shift state, one state reducing A -> 'a')
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
                    transitions: vec![
                        (RawSymbol::N { id: 1 }, 1),
                        (RawSymbol::T { id: 0 }, 2),
                    ],
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

    #[test]
    fn predecessors_invert_successors() {
        let table = tiny_table();
        for s in table.states() {
            for any in table.successors(s) {
                assert_eq!(table.source(*any), s);
                let target = table.target(*any);
                assert!(table
                    .predecessors(target)
                    .iter()
                    .any(|p| table.source(*p) == s));
            }
        }
    }

    #[test]
    fn reductions_by_depth_excludes_start_productions() {
        let table = tiny_table();
        let reds = table.reductions_by_depth(StateId(2));
        assert_eq!(reds.len(), 2);
        assert!(reds[0].is_empty());
        assert!(reds[1].contains(&NonTermId(1)));
    }

    #[test]
    fn state_with_no_reductions_has_empty_table() {
        let table = tiny_table();
        let reds = table.reductions_by_depth(StateId(1));
        assert!(reds.is_empty());
    }
}
