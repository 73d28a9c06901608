use std::convert::From;

/// Errors raised while building a [`crate::LexicalAnalyzer`].
#[derive(Debug, PartialEq)]
pub enum LexanError<'a, H> {
    DuplicateHandle(H),
    DuplicatePattern(&'a str),
    EmptyPattern(Option<H>),
    RegexError(regex::Error),
}

impl<'a, H> From<regex::Error> for LexanError<'a, H> {
    fn from(error: regex::Error) -> Self {
        LexanError::RegexError(error)
    }
}
