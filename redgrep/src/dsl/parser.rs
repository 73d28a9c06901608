// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Hand-written recursive-descent parser for the pattern DSL (§6.2). The
//! grammar is small enough, and regular enough, that a generated LALR
//! parser would be overkill; the front end consumes patterns one clause at
//! a time and builds the surface tree in [`crate::dsl::ast`].

use lexan::TokenStream;

use super::ast::*;
use super::lexer::{self, Tok};
use crate::errors::ParseError;

pub fn parse(source: String, label: &str) -> Result<SourceFile, ParseError> {
    let stream = lexer::tokenize(source, label);
    Parser::new(stream).parse_source_file()
}

struct Parser {
    stream: TokenStream<Tok>,
}

impl Parser {
    fn new(stream: TokenStream<Tok>) -> Self {
        Self { stream }
    }

    fn current(&self) -> Result<lexan::Token<Tok>, ParseError> {
        self.stream
            .front()
            .map_err(|e| ParseError::from(lexer::convert_error(e)))
    }

    fn peek(&self) -> Result<Tok, ParseError> {
        Ok(*self.current()?.tag())
    }

    fn span(&self) -> Result<Span, ParseError> {
        Ok(self.current()?.location().clone())
    }

    fn advance(&mut self) {
        self.stream.advance();
    }

    fn expect(&mut self, tag: Tok) -> Result<lexan::Token<Tok>, ParseError> {
        let token = self.current()?;
        if *token.tag() == tag {
            self.advance();
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                found: tag_name(*token.tag()).to_string(),
                expected: vec![tag_name(tag)],
                span: token.location().clone(),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        let token = self.expect(Tok::Ident)?;
        Ok((token.lexeme().to_string(), token.location().clone()))
    }

    fn at_atom_start(&self) -> Result<bool, ParseError> {
        Ok(matches!(
            self.peek()?,
            Tok::Ident | Tok::Dot | Tok::Underscore | Tok::Bang | Tok::LBracket
        ))
    }

    fn parse_source_file(&mut self) -> Result<SourceFile, ParseError> {
        let mut start_symbols = Vec::new();
        if self.peek()? == Tok::KwStart {
            self.advance();
            while self.peek()? == Tok::Ident {
                start_symbols.push(self.expect_ident()?);
            }
            if self.peek()? == Tok::Semicolon {
                self.advance();
            }
        }
        let mut rules = Vec::new();
        while self.peek()? == Tok::KwRule {
            rules.push(self.parse_rule()?);
        }
        if self.peek()? != Tok::End {
            let token = self.current()?;
            return Err(ParseError::UnexpectedToken {
                found: tag_name(*token.tag()).to_string(),
                expected: vec!["rule"],
                span: token.location().clone(),
            });
        }
        Ok(SourceFile {
            start_symbols,
            rules,
        })
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        let span = self.span()?;
        self.expect(Tok::KwRule)?;
        let (name, _) = self.expect_ident()?;
        let mut args = Vec::new();
        while self.peek()? == Tok::Ident {
            args.push(self.expect_ident()?.0);
        }
        self.expect(Tok::Equals)?;
        let mut clauses = vec![self.parse_clause()?];
        while self.at_atom_start()? {
            clauses.push(self.parse_clause()?);
        }
        Ok(Rule {
            name,
            args,
            clauses,
            span,
        })
    }

    fn parse_clause(&mut self) -> Result<Clause, ParseError> {
        let span = self.span()?;
        let pattern = self.parse_pattern()?;
        let action = if self.peek()? == Tok::KwUnreachable {
            self.advance();
            Action::Unreachable
        } else {
            let partial = if self.peek()? == Tok::KwPartial {
                self.advance();
                true
            } else {
                false
            };
            let token = self.expect(Tok::Code)?;
            let raw = token.lexeme();
            let text = raw[1..raw.len() - 1].to_string();
            Action::Code { text, partial }
        };
        Ok(Clause {
            pattern,
            action,
            span,
        })
    }

    fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.parse_alt()
    }

    fn parse_alt(&mut self) -> Result<Pattern, ParseError> {
        let mut arms = vec![self.parse_seq()?];
        while self.peek()? == Tok::Pipe {
            self.advance();
            arms.push(self.parse_seq()?);
        }
        if arms.len() == 1 {
            Ok(arms.pop().unwrap())
        } else {
            Ok(Pattern::Alt(arms))
        }
    }

    fn parse_seq(&mut self) -> Result<Pattern, ParseError> {
        let mut terms = vec![self.parse_postfix()?];
        loop {
            if self.peek()? == Tok::Semicolon {
                self.advance();
                terms.push(self.parse_postfix()?);
            } else if self.at_atom_start()? {
                terms.push(self.parse_postfix()?);
            } else {
                break;
            }
        }
        if terms.len() == 1 {
            Ok(terms.pop().unwrap())
        } else {
            Ok(Pattern::Seq(terms))
        }
    }

    fn parse_postfix(&mut self) -> Result<Pattern, ParseError> {
        let mut atom = self.parse_atom()?;
        while self.peek()? == Tok::Star {
            self.advance();
            atom = Pattern::Star(Box::new(atom));
        }
        Ok(atom)
    }

    fn parse_atom(&mut self) -> Result<Pattern, ParseError> {
        let span = self.span()?;
        match self.peek()? {
            Tok::Ident => {
                let (name, span) = self.expect_ident()?;
                Ok(Pattern::Symbol(name, span))
            }
            Tok::Dot => {
                self.advance();
                Ok(Pattern::Any(span))
            }
            Tok::Underscore => {
                self.advance();
                Ok(Pattern::Skip(span))
            }
            Tok::Bang => {
                self.advance();
                Ok(Pattern::Reduce(span))
            }
            Tok::LBracket => {
                self.advance();
                let item = self.parse_item()?;
                self.expect(Tok::RBracket)?;
                Ok(Pattern::Item(item, span))
            }
            other => {
                let token = self.current()?;
                Err(ParseError::UnexpectedToken {
                    found: tag_name(other).to_string(),
                    expected: vec!["symbol", ".", "_", "!", "["],
                    span: token.location().clone(),
                })
            }
        }
    }

    fn parse_symbol_template(&mut self) -> Result<SymbolTemplate, ParseError> {
        match self.peek()? {
            Tok::Ident => Ok(SymbolTemplate::Named(self.expect_ident()?.0)),
            Tok::Underscore => {
                self.advance();
                Ok(SymbolTemplate::Wildcard)
            }
            other => {
                let token = self.current()?;
                Err(ParseError::UnexpectedToken {
                    found: tag_name(other).to_string(),
                    expected: vec!["symbol", "_"],
                    span: token.location().clone(),
                })
            }
        }
    }

    /// `(nt ':')? symbol* '.' symbol*`. The optional leading `nt ':'` is
    /// disambiguated from an ordinary prefix symbol with one token of
    /// lookahead past the identifier.
    fn parse_item(&mut self) -> Result<ItemTemplate, ParseError> {
        let mut lhs = None;
        let mut pending = None;
        match self.peek()? {
            Tok::Ident => {
                let (name, _) = self.expect_ident()?;
                if self.peek()? == Tok::Colon {
                    self.advance();
                    lhs = Some(name);
                } else {
                    pending = Some(SymbolTemplate::Named(name));
                }
            }
            Tok::Underscore => {
                self.advance();
                pending = Some(SymbolTemplate::Wildcard);
            }
            _ => {}
        }
        let mut prefix = Vec::new();
        if let Some(p) = pending.take() {
            prefix.push(p);
        }
        while matches!(self.peek()?, Tok::Ident | Tok::Underscore) {
            prefix.push(self.parse_symbol_template()?);
        }
        self.expect(Tok::Dot)?;
        let mut suffix = Vec::new();
        while matches!(self.peek()?, Tok::Ident | Tok::Underscore) {
            suffix.push(self.parse_symbol_template()?);
        }
        Ok(ItemTemplate { lhs, prefix, suffix })
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_symbol_clause() {
        let source = "rule missing_operand = a { \"bad\" }".to_string();
        let file = parse(source, "test").unwrap();
        assert_eq!(file.rules.len(), 1);
        assert_eq!(file.rules[0].name, "missing_operand");
        assert_eq!(file.rules[0].clauses.len(), 1);
        assert!(matches!(
            file.rules[0].clauses[0].pattern,
            Pattern::Symbol(ref s, _) if s == "a"
        ));
    }

    #[test]
    fn parses_item_template_with_lhs_and_wildcards() {
        let source = "rule r = [E: E PLUS . E] { \"missing operand\" }".to_string();
        let file = parse(source, "test").unwrap();
        match &file.rules[0].clauses[0].pattern {
            Pattern::Item(item, _) => {
                assert_eq!(item.lhs.as_deref(), Some("E"));
                assert_eq!(
                    item.prefix,
                    vec![
                        SymbolTemplate::Named("E".to_string()),
                        SymbolTemplate::Named("PLUS".to_string())
                    ]
                );
                assert_eq!(item.suffix, vec![SymbolTemplate::Named("E".to_string())]);
            }
            other => panic!("expected item pattern, got {:?}", other),
        }
    }

    #[test]
    fn parses_star_seq_reduce_unreachable() {
        let source = "rule r = _* ; LPAREN ; ! unreachable".to_string();
        let file = parse(source, "test").unwrap();
        assert!(matches!(
            file.rules[0].clauses[0].action,
            Action::Unreachable
        ));
        match &file.rules[0].clauses[0].pattern {
            Pattern::Seq(terms) => assert_eq!(terms.len(), 3),
            other => panic!("expected seq, got {:?}", other),
        }
    }

    #[test]
    fn parses_alternation_priority_order() {
        let source = "rule r = p1 { \"a1\" } p2 { \"a2\" }".to_string();
        let file = parse(source, "test").unwrap();
        assert_eq!(file.rules[0].clauses.len(), 2);
    }

    #[test]
    fn reports_unexpected_token() {
        let source = "rule r = = { \"x\" }".to_string();
        let err = parse(source, "test").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }
}
