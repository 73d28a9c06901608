// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Resolves the bare names in a parsed [`super::ast::SourceFile`] against
//! the grammar, producing a tree of state sets ready for translation into
//! `RE` (§4.D). Resolution errors fail eagerly: the first unknown name
//! aborts the pass (§7).

use std::collections::{BTreeMap, BTreeSet};

use super::ast;
use crate::errors::ResolutionError;
use crate::grammar::{Lr1Table, StateId, Symbol};
use crate::item_matcher::ItemMatcher;

#[derive(Debug, Clone)]
pub enum ResolvedPattern {
    Alt(Vec<ResolvedPattern>),
    Seq(Vec<ResolvedPattern>),
    Star(Box<ResolvedPattern>),
    States(BTreeSet<StateId>),
    Reduce,
}

#[derive(Debug, Clone)]
pub struct ResolvedClause {
    pub pattern: ResolvedPattern,
    pub action: ast::Action,
    pub span: ast::Span,
}

#[derive(Debug, Clone)]
pub struct ResolvedRule {
    pub name: String,
    pub args: Vec<String>,
    pub clauses: Vec<ResolvedClause>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSourceFile {
    pub start_symbols: Vec<Symbol>,
    pub rules: Vec<ResolvedRule>,
}

pub fn resolve(
    table: &Lr1Table,
    matcher: &ItemMatcher,
    file: &ast::SourceFile,
) -> Result<ResolvedSourceFile, ResolutionError> {
    let mut start_symbols = Vec::new();
    for (name, span) in &file.start_symbols {
        start_symbols.push(resolve_symbol(table, name, span)?);
    }

    let mut seen: BTreeMap<String, ast::Span> = BTreeMap::new();
    let mut rules = Vec::new();
    for rule in &file.rules {
        if let Some(previous) = seen.get(&rule.name) {
            return Err(ResolutionError::DuplicateRuleName(
                rule.name.clone(),
                previous.clone(),
                rule.span.clone(),
            ));
        }
        seen.insert(rule.name.clone(), rule.span.clone());

        let mut clauses = Vec::new();
        for clause in &rule.clauses {
            let pattern = resolve_pattern(table, matcher, &clause.pattern)?;
            clauses.push(ResolvedClause {
                pattern,
                action: clause.action.clone(),
                span: clause.span.clone(),
            });
        }
        rules.push(ResolvedRule {
            name: rule.name.clone(),
            args: rule.args.clone(),
            clauses,
        });
    }

    Ok(ResolvedSourceFile {
        start_symbols,
        rules,
    })
}

fn resolve_symbol(table: &Lr1Table, name: &str, span: &ast::Span) -> Result<Symbol, ResolutionError> {
    table
        .symbol_named(name)
        .ok_or_else(|| ResolutionError::UnknownSymbol(name.to_string(), span.clone()))
}

fn resolve_pattern(
    table: &Lr1Table,
    matcher: &ItemMatcher,
    pattern: &ast::Pattern,
) -> Result<ResolvedPattern, ResolutionError> {
    match pattern {
        ast::Pattern::Alt(arms) => Ok(ResolvedPattern::Alt(
            arms.iter()
                .map(|p| resolve_pattern(table, matcher, p))
                .collect::<Result<_, _>>()?,
        )),
        ast::Pattern::Seq(terms) => Ok(ResolvedPattern::Seq(
            terms
                .iter()
                .map(|p| resolve_pattern(table, matcher, p))
                .collect::<Result<_, _>>()?,
        )),
        ast::Pattern::Star(inner) => Ok(ResolvedPattern::Star(Box::new(resolve_pattern(
            table, matcher, inner,
        )?))),
        ast::Pattern::Reduce(_) => Ok(ResolvedPattern::Reduce),
        ast::Pattern::Any(_) | ast::Pattern::Skip(_) => {
            Ok(ResolvedPattern::States(table.states().collect()))
        }
        ast::Pattern::Symbol(name, span) => {
            let symbol = resolve_symbol(table, name, span)?;
            Ok(ResolvedPattern::States(matcher.states_of_symbol(&symbol)))
        }
        ast::Pattern::Item(item, span) => {
            let lhs = match &item.lhs {
                Some(name) => Some(
                    table
                        .nonterminal_named(name)
                        .ok_or_else(|| ResolutionError::UnknownNonTerminal(name.clone(), span.clone()))?,
                ),
                None => None,
            };
            let prefix = resolve_symbol_templates(table, &item.prefix, span)?;
            let suffix = resolve_symbol_templates(table, &item.suffix, span)?;
            Ok(ResolvedPattern::States(matcher.states_by_items(
                lhs,
                &prefix,
                &suffix,
            )))
        }
    }
}

fn resolve_symbol_templates(
    table: &Lr1Table,
    templates: &[ast::SymbolTemplate],
    span: &ast::Span,
) -> Result<Vec<Option<Symbol>>, ResolutionError> {
    templates
        .iter()
        .map(|t| match t {
            ast::SymbolTemplate::Wildcard => Ok(None),
            ast::SymbolTemplate::Named(name) => {
                resolve_symbol(table, name, span).map(Some)
            }
        })
        .collect()
}
