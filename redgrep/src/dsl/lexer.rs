// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! The token set and lexical analyzer for the pattern DSL, built on
//! [`lexan`].

use std::fmt;
use std::rc::Rc;

use crate::errors::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tok {
    KwRule,
    KwUnreachable,
    KwPartial,
    KwStart,
    Ident,
    Colon,
    Equals,
    Semicolon,
    Pipe,
    Star,
    LBracket,
    RBracket,
    Bang,
    Dot,
    Underscore,
    Code,
    End,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub fn analyzer() -> Rc<lexan::LexicalAnalyzer<Tok>> {
    Rc::new(
        lexan::LexicalAnalyzer::new(
            &[
                (Tok::KwRule, "rule"),
                (Tok::KwUnreachable, "unreachable"),
                (Tok::KwPartial, "partial"),
                (Tok::KwStart, "start"),
                (Tok::Colon, ":"),
                (Tok::Equals, "="),
                (Tok::Semicolon, ";"),
                (Tok::Pipe, "|"),
                (Tok::Star, "*"),
                (Tok::LBracket, "["),
                (Tok::RBracket, "]"),
                (Tok::Bang, "!"),
                (Tok::Dot, "."),
                (Tok::Underscore, "_"),
            ],
            &[
                (Tok::Ident, r"[A-Za-z][A-Za-z0-9_]*"),
                // A single non-nesting brace-delimited block of action code.
                (Tok::Code, r"\{[^{}]*\}"),
            ],
            &[r"[ \t\r\n]+", r"//[^\n]*"],
            Tok::End,
        )
        .expect("the DSL's fixed pattern table is well-formed"),
    )
}

pub fn tokenize(source: String, label: &str) -> lexan::TokenStream<Tok> {
    analyzer().tokenize(source, label)
}

pub fn convert_error(error: lexan::Error<Tok>) -> LexError {
    match error {
        lexan::Error::UnexpectedText(text, location) => LexError::UnexpectedText(text, location),
        lexan::Error::AmbiguousMatches(tags, _text, location) => LexError::AmbiguousMatches(
            tags.into_iter().map(|t| tag_name(t)).collect(),
            location,
        ),
        lexan::Error::AdvancedWhenEmpty(location) => {
            LexError::UnexpectedText(String::new(), location)
        }
    }
}

fn tag_name(tag: Tok) -> &'static str {
    match tag {
        Tok::KwRule => "rule",
        Tok::KwUnreachable => "unreachable",
        Tok::KwPartial => "partial",
        Tok::KwStart => "start",
        Tok::Ident => "identifier",
        Tok::Colon => ":",
        Tok::Equals => "=",
        Tok::Semicolon => ";",
        Tok::Pipe => "|",
        Tok::Star => "*",
        Tok::LBracket => "[",
        Tok::RBracket => "]",
        Tok::Bang => "!",
        Tok::Dot => ".",
        Tok::Underscore => "_",
        Tok::Code => "{ ... }",
        Tok::End => "end of input",
    }
}
