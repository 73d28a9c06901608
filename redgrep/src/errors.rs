// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Error types, one enum per stage of the pipeline: loading the grammar
//! table, lexing and parsing the pattern DSL, resolving symbolic names
//! against the grammar, and compiling the resolved patterns. Each enum
//! implements `Display` by hand, in keeping with the rest of the crate.

use std::fmt;
use std::path::PathBuf;

use crate::dsl::ast::Span;

#[derive(Debug)]
pub enum ConfigError {
    UnreadablePath(PathBuf, std::io::Error),
    MalformedGrammarTable(serde_json::Error),
    OutputExists(PathBuf),
    UnwritablePath(PathBuf, std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::UnreadablePath(path, e) => {
                write!(f, "{}: could not be read: {}", path.display(), e)
            }
            ConfigError::MalformedGrammarTable(e) => {
                write!(f, "grammar table is malformed: {}", e)
            }
            ConfigError::OutputExists(path) => write!(
                f,
                "{}: already exists (use --force to overwrite)",
                path.display()
            ),
            ConfigError::UnwritablePath(path, e) => {
                write!(f, "{}: could not be written: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedText(String, Span),
    AmbiguousMatches(Vec<&'static str>, Span),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LexError::UnexpectedText(text, span) => {
                write!(f, "{}: unexpected text: \"{}\"", span, text)
            }
            LexError::AmbiguousMatches(tags, span) => {
                write!(f, "{}: ambiguous match among {:?}", span, tags)
            }
        }
    }
}

impl std::error::Error for LexError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        found: String,
        expected: Vec<&'static str>,
        span: Span,
    },
    UnexpectedEof {
        expected: Vec<&'static str>,
    },
    InvalidInteger(String, Span),
    Lex(LexError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                found,
                expected,
                span,
            } => write!(
                f,
                "{}: unexpected {}, expected one of {:?}",
                span, found, expected
            ),
            ParseError::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected one of {:?}", expected)
            }
            ParseError::InvalidInteger(text, span) => {
                write!(f, "{}: invalid integer literal: \"{}\"", span, text)
            }
            ParseError::Lex(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

/// Errors raised while resolving the names used in a parsed rule set
/// against the grammar's terminal and nonterminal tables (§6.2, §7).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// A bare symbol reference (pattern atom or `start` declaration) that
    /// names neither a terminal nor a nonterminal of the loaded grammar.
    UnknownSymbol(String, Span),
    UnknownNonTerminal(String, Span),
    UnknownProduction(String, Span),
    DuplicateRuleName(String, Span, Span),
    EmptyAlternation(Span),
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolutionError::UnknownSymbol(name, span) => {
                write!(f, "{}: Unknown symbol {}", span, name)
            }
            ResolutionError::UnknownNonTerminal(name, span) => {
                write!(f, "{}: unknown nonterminal \"{}\"", span, name)
            }
            ResolutionError::UnknownProduction(name, span) => {
                write!(f, "{}: unknown production \"{}\"", span, name)
            }
            ResolutionError::DuplicateRuleName(name, first, second) => write!(
                f,
                "{}: rule \"{}\" already defined at {}",
                second, name, first
            ),
            ResolutionError::EmptyAlternation(span) => {
                write!(f, "{}: alternation has no arms", span)
            }
        }
    }
}

impl std::error::Error for ResolutionError {}

/// Violations of invariants that the core is expected to maintain
/// internally (e.g. a reducible nonterminal with no matching `goto`).
/// Surfacing these as a distinct, unconditionally-fatal error type keeps
/// them from being silently swallowed alongside ordinary user-facing
/// configuration and DSL errors.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalInvariant(pub String);

impl fmt::Display for InternalInvariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "internal invariant violated: {}", self.0)
    }
}

impl std::error::Error for InternalInvariant {}

#[derive(Debug)]
pub enum RedgrepError {
    Config(ConfigError),
    Parse(ParseError),
    Resolution(Vec<ResolutionError>),
    Internal(InternalInvariant),
}

impl fmt::Display for RedgrepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RedgrepError::Config(e) => write!(f, "{}", e),
            RedgrepError::Parse(e) => write!(f, "{}", e),
            RedgrepError::Resolution(es) => {
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
            RedgrepError::Internal(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RedgrepError {}

impl From<ConfigError> for RedgrepError {
    fn from(e: ConfigError) -> Self {
        RedgrepError::Config(e)
    }
}

impl From<ParseError> for RedgrepError {
    fn from(e: ParseError) -> Self {
        RedgrepError::Parse(e)
    }
}

impl From<InternalInvariant> for RedgrepError {
    fn from(e: InternalInvariant) -> Self {
        RedgrepError::Internal(e)
    }
}
