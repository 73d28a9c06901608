// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Code generation (§6.4, §10.4): writes the user's header block verbatim,
//! then one module per compiled rule holding its DFA tables and action
//! dispatcher, then the user's trailer block verbatim. Follows the
//! teacher's `write_*_code<W: Write>(&self, wtr: &mut W) -> io::Result<()>`
//! idiom (`grammar.rs`'s `write_next_action_code`/`write_goto_table_code`):
//! one writer method per generated section, byte literals for fixed text,
//! `write_fmt` for templated lines.

use std::io::{self, Write};

use crate::dfa::Dfa;
use crate::dsl::ast::Action;

/// One rule's compiled recognizer, ready to be written out: its DFA plus
/// the clause actions it was built from (in clause-index order, so
/// `actions[i]` is the action for the clause that set `dfa.accept[s] ==
/// Some(i)`).
pub struct CompiledRule {
    pub name: String,
    pub args: Vec<String>,
    pub dfa: Dfa,
    pub actions: Vec<Action>,
}

/// Writes the complete output file (§6.4): header, one `pub mod` per
/// compiled rule, trailer.
pub fn write_output<W: Write>(
    wtr: &mut W,
    header: &str,
    rules: &[CompiledRule],
    trailer: &str,
) -> io::Result<()> {
    wtr.write_all(header.as_bytes())?;
    wtr.write_all(b"// --- generated by redgrep: do not edit below this line ---\n\n")?;
    for rule in rules {
        write_rule(wtr, rule)?;
    }
    wtr.write_all(trailer.as_bytes())?;
    Ok(())
}

fn write_rule<W: Write>(wtr: &mut W, rule: &CompiledRule) -> io::Result<()> {
    wtr.write_fmt(format_args!(
        "pub mod {} {{\n    #![allow(dead_code)]\n",
        rule.name,
    ))?;
    for (i, arg) in rule.args.iter().enumerate() {
        wtr.write_fmt(format_args!("    // arg {}: {}\n", i, arg))?;
    }
    wtr.write_all(b"    use std::collections::BTreeSet;\n")?;
    wtr.write_all(b"    use lazy_static::lazy_static;\n\n")?;
    write_accept_table(wtr, &rule.dfa)?;
    write_label_table(wtr, &rule.dfa)?;
    write_next_state_code(wtr)?;
    write_recognize_code(wtr)?;
    write_action_dispatch_code(wtr, rule)?;
    wtr.write_all(b"}\n\n")?;
    Ok(())
}

fn write_accept_table<W: Write>(wtr: &mut W, dfa: &Dfa) -> io::Result<()> {
    wtr.write_all(b"    lazy_static! {\n")?;
    wtr.write_all(b"        static ref ACCEPT: Vec<Option<usize>> = vec![\n")?;
    for accept in &dfa.accept {
        match accept {
            Some(clause) => wtr.write_fmt(format_args!("            Some({}),\n", clause))?,
            None => wtr.write_all(b"            None,\n")?,
        }
    }
    wtr.write_all(b"        ];\n")?;
    wtr.write_all(b"    }\n\n")?;
    Ok(())
}

fn write_label_table<W: Write>(wtr: &mut W, dfa: &Dfa) -> io::Result<()> {
    wtr.write_all(b"    lazy_static! {\n")?;
    wtr.write_all(
        b"        static ref TRANSITIONS: Vec<Vec<(BTreeSet<u32>, usize)>> = vec![\n",
    )?;
    for outs in &dfa.transitions {
        wtr.write_all(b"            vec![\n")?;
        for (label, target) in outs {
            let members: Vec<String> = label.iter().map(|s| format!("{}", s.0)).collect();
            wtr.write_fmt(format_args!(
                "                (vec![{}].into_iter().collect(), {}),\n",
                members.join(", "),
                target,
            ))?;
        }
        wtr.write_all(b"            ],\n")?;
    }
    wtr.write_all(b"        ];\n")?;
    wtr.write_all(b"    }\n\n")?;
    Ok(())
}

fn write_next_state_code<W: Write>(wtr: &mut W) -> io::Result<()> {
    wtr.write_all(b"    fn next_state(state: usize, top: u32) -> Option<usize> {\n")?;
    wtr.write_all(
        b"        TRANSITIONS[state].iter().find(|(set, _)| set.contains(&top)).map(|(_, t)| *t)\n",
    )?;
    wtr.write_all(b"    }\n\n")?;
    Ok(())
}

/// Walks the real parse stack, top frame first, following a `TRANSITIONS`
/// edge per frame while one exists; the DFA's `Reduce` transitions were
/// already folded into these edges at compile time (§4.F), so no further
/// reduction simulation is needed here — only a plain stack walk. Returns
/// the lowest-index clause accepted by the deepest state reached, i.e. the
/// longest match (§9 "Open questions": the specification leaves the exact
/// runtime-matching discipline unstated; see DESIGN.md).
fn write_recognize_code<W: Write>(wtr: &mut W) -> io::Result<()> {
    wtr.write_all(b"    pub fn recognize(stack: &[u32]) -> Option<usize> {\n")?;
    wtr.write_all(b"        let mut state = 0usize;\n")?;
    wtr.write_all(b"        let mut best = ACCEPT[state];\n")?;
    wtr.write_all(b"        for &top in stack {\n")?;
    wtr.write_all(b"            match next_state(state, top) {\n")?;
    wtr.write_all(b"                Some(next) => {\n")?;
    wtr.write_all(b"                    state = next;\n")?;
    wtr.write_all(b"                    if let Some(clause) = ACCEPT[state] {\n")?;
    wtr.write_all(b"                        best = Some(clause);\n")?;
    wtr.write_all(b"                    }\n")?;
    wtr.write_all(b"                }\n")?;
    wtr.write_all(b"                None => break,\n")?;
    wtr.write_all(b"            }\n")?;
    wtr.write_all(b"        }\n")?;
    wtr.write_all(b"        best\n")?;
    wtr.write_all(b"    }\n\n")?;
    Ok(())
}

fn write_action_dispatch_code<W: Write>(wtr: &mut W, rule: &CompiledRule) -> io::Result<()> {
    wtr.write_all(b"    pub enum Clause {\n")?;
    wtr.write_all(b"        Code { partial: bool, text: &'static str },\n")?;
    wtr.write_all(b"        Unreachable,\n")?;
    wtr.write_all(b"    }\n\n")?;
    wtr.write_all(b"    pub fn clause(index: usize) -> Clause {\n")?;
    wtr.write_all(b"        match index {\n")?;
    for (i, action) in rule.actions.iter().enumerate() {
        match action {
            Action::Code { text, partial } => wtr.write_fmt(format_args!(
                "            {} => Clause::Code {{ partial: {}, text: {:?} }},\n",
                i, partial, text,
            ))?,
            Action::Unreachable => {
                wtr.write_fmt(format_args!("            {} => Clause::Unreachable,\n", i))?
            }
        }
    }
    wtr.write_fmt(format_args!(
        "            _ => panic!(\"illegal clause index: {{}}\", index),\n",
    ))?;
    wtr.write_all(b"        }\n")?;
    wtr.write_all(b"    }\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Ctx;
    use crate::dsl::ast::Span;
    use crate::dsl::resolve::{ResolvedClause, ResolvedPattern};
    use crate::grammar::{
        Lr1Table, RawProduction, RawProductionKind, RawState, RawSymbol, RawTable, TermId,
    };
    use crate::item_matcher::ItemMatcher;
    use crate::pattern::kre_list;

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
    fn writes_header_tables_and_trailer() {
        let table = tiny_table();
        let ctx = Ctx::new(&table).unwrap();
        let matcher = ItemMatcher::new(&table);
        let states = matcher.states_of_symbol(&crate::grammar::Symbol::Terminal(TermId(0)));
        let clauses = vec![ResolvedClause {
            pattern: ResolvedPattern::States(states),
            action: Action::Code {
                text: "\"bad token\"".to_string(),
                partial: false,
            },
            span: Span::new("test"),
        }];
        let entry = kre_list(&clauses);
        let dfa = crate::dfa::build(&ctx, entry);
        let rule = CompiledRule {
            name: "missing_operand".to_string(),
            args: vec![],
            dfa,
            actions: clauses.iter().map(|c| c.action.clone()).collect(),
        };

        let mut out = Vec::new();
        write_output(&mut out, "// header\n", &[rule], "// trailer\n").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("// header\n"));
        assert!(text.trim_end().ends_with("// trailer"));
        assert!(text.contains("pub mod missing_operand"));
        assert!(text.contains("pub fn recognize"));
        assert!(text.contains("Clause::Code"));
    }
}
