// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! The surface syntax tree produced by the DSL parser (§6.2). This is the
//! hand-off point with the rest of the pipeline: the resolver (`dsl::resolve`)
//! turns the bare names here into `Symbol`s and production references that
//! the translation step (`pattern::translate`) can lower into `RE`.

pub use lexan::Location as Span;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub start_symbols: Vec<(String, Span)>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub args: Vec<String>,
    pub clauses: Vec<Clause>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Clause {
    pub pattern: Pattern,
    pub action: Action,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Action {
    Code { text: String, partial: bool },
    Unreachable,
}

/// A parsed pattern, in ordinary regex precedence (alternation of sequences
/// of postfixed atoms). `;` and bare juxtaposition both produce `Seq`.
#[derive(Debug, Clone)]
pub enum Pattern {
    Alt(Vec<Pattern>),
    Seq(Vec<Pattern>),
    Star(Box<Pattern>),
    Symbol(String, Span),
    Any(Span),
    Skip(Span),
    Reduce(Span),
    Item(ItemTemplate, Span),
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Alt(ps) | Pattern::Seq(ps) => {
                ps.first().map(|p| p.span()).unwrap_or_default()
            }
            Pattern::Star(p) => p.span(),
            Pattern::Symbol(_, s)
            | Pattern::Any(s)
            | Pattern::Skip(s)
            | Pattern::Reduce(s)
            | Pattern::Item(_, s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemTemplate {
    pub lhs: Option<String>,
    pub prefix: Vec<SymbolTemplate>,
    pub suffix: Vec<SymbolTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolTemplate {
    Named(String),
    Wildcard,
}
