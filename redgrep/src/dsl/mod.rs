// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! The pattern-matching DSL front end (§6.2): lexer, recursive-descent
//! parser, and name resolver. Everything downstream of `resolve` works in
//! terms of `StateId` sets, never bare names.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod resolve;

pub use ast::SourceFile;
pub use resolve::{resolve, ResolvedSourceFile};
