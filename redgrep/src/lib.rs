// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Compiles a pattern-matching DSL over LR(1) parser-stack states into a
//! deterministic recognizer (see `SPEC_FULL.md` for the full design). The
//! core pipeline is components A-G below; `dsl` and `codegen` are the
//! ambient front end and back end that make the pipeline runnable as a
//! standalone tool (`main.rs`).

pub mod codegen;
pub mod context;
pub mod dfa;
pub mod dsl;
pub mod errors;
pub mod grammar;
pub mod item_matcher;
pub mod partition;
pub mod pattern;
pub mod redgraph;
pub mod reduce;

use codegen::CompiledRule;
use context::Ctx;
use dsl::resolve::ResolvedSourceFile;
use errors::RedgrepError;
use grammar::Lr1Table;

/// Runs the core pipeline (§4.D-§4.G) once per rule in a resolved source
/// file, producing one compiled DFA ready for `codegen::write_output`.
/// Built against a single shared [`Ctx`] so the reduction graph and the
/// reduction-derivative cache are computed once and reused across rules.
pub fn compile_rules(
    table: &Lr1Table,
    source: &ResolvedSourceFile,
) -> Result<Vec<CompiledRule>, RedgrepError> {
    let ctx = Ctx::new(table)?;
    let mut compiled = Vec::with_capacity(source.rules.len());
    for rule in &source.rules {
        let entry = pattern::kre_list(&rule.clauses);
        let dfa = dfa::build(&ctx, entry);
        let actions = rule.clauses.iter().map(|c| c.action.clone()).collect();
        compiled.push(CompiledRule {
            name: rule.name.clone(),
            args: rule.args.clone(),
            dfa,
            actions,
        });
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsl::ast::Action;
    use grammar::{RawProduction, RawProductionKind, RawState, RawSymbol, RawTable};

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

    #[test]
    fn compiles_one_dfa_per_rule_from_source_text() {
        let table = tiny_table();
        let matcher = item_matcher::ItemMatcher::new(&table);
        let ast = dsl::parser::parse(
            "rule missing_operand = a { \"bad\" }".to_string(),
            "test",
        )
        .unwrap();
        let resolved = dsl::resolve(&table, &matcher, &ast).unwrap();
        let compiled = compile_rules(&table, &resolved).unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].name, "missing_operand");
        assert!(matches!(compiled[0].actions[0], Action::Code { .. }));
        assert!(compiled[0].dfa.num_states() >= 2);
    }
}
