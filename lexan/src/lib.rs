use std::{
    fmt::{self, Debug, Display},
    rc::Rc,
};

use regex::Regex;

pub mod error;
pub use error::LexanError;

/// Human friendly position of a lexeme within the text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    line_number: usize,
    offset: usize,
    label: String,
}

impl Location {
    pub fn new(label: &str) -> Self {
        Self {
            line_number: 1,
            offset: 1,
            label: label.to_string(),
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn advance(&mut self, consumed: &str) {
        let mut rest = consumed;
        while let Some(eol) = rest.find('\n') {
            self.line_number += 1;
            self.offset = 1;
            rest = &rest[eol + 1..];
        }
        self.offset += rest.chars().count();
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}:{}", self.line_number, self.offset)
        } else if self.label.contains(' ') || self.label.contains('\t') {
            write!(f, "\"{}\":{}:{}", self.label, self.line_number, self.offset)
        } else {
            write!(f, "{}:{}:{}", self.label, self.line_number, self.offset)
        }
    }
}

/// A lexical error with the location at which it was detected.
#[derive(Clone, Debug)]
pub enum Error<H: Display + Copy> {
    UnexpectedText(String, Location),
    AmbiguousMatches(Vec<H>, String, Location),
    AdvancedWhenEmpty(Location),
}

impl<H: Display + Copy> Error<H> {
    pub fn location(&self) -> &Location {
        match self {
            Error::UnexpectedText(_, location) => location,
            Error::AmbiguousMatches(_, _, location) => location,
            Error::AdvancedWhenEmpty(location) => location,
        }
    }
}

impl<H: Debug + Display + Copy> fmt::Display for Error<H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnexpectedText(text, location) => {
                write!(f, "Unexpected text \"{}\" at: {}.", text, location)
            }
            Error::AmbiguousMatches(tags, text, location) => write!(
                f,
                "Ambiguous matches {:?} for \"{}\" at: {}.",
                tags, text, location
            ),
            Error::AdvancedWhenEmpty(location) => {
                write!(f, "Advanced past end of text at: {}.", location)
            }
        }
    }
}

impl<H: Debug + Display + Copy> std::error::Error for Error<H> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<H: Display + Copy + Eq> {
    tag: H,
    lexeme: String,
    location: Location,
}

impl<H: Display + Copy + Eq> Token<H> {
    pub fn tag(&self) -> &H {
        &self.tag
    }

    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// One handle-tagged, longest-match-wins matcher over a fixed pattern set.
#[derive(Debug)]
struct RegexMatcher<H: Copy + Debug> {
    lexemes: Vec<(H, Regex)>,
}

impl<H: Copy + Ord + Debug> RegexMatcher<H> {
    fn new_literal<'a>(patterns: &[(H, &'a str)]) -> Result<Self, LexanError<'a, H>> {
        let mut handles = vec![];
        let mut lexemes = vec![];
        for (handle, text) in patterns.iter() {
            if text.is_empty() {
                return Err(LexanError::EmptyPattern(Some(*handle)));
            }
            if handles.contains(handle) {
                return Err(LexanError::DuplicateHandle(*handle));
            }
            handles.push(*handle);
            let anchored = format!("\\A{}", regex::escape(text));
            lexemes.push((*handle, Regex::new(&anchored)?));
        }
        Ok(Self { lexemes })
    }

    fn new_regex<'a>(patterns: &[(H, &'a str)]) -> Result<Self, LexanError<'a, H>> {
        let mut handles = vec![];
        let mut seen_patterns = vec![];
        let mut lexemes = vec![];
        for (handle, pattern) in patterns.iter() {
            if pattern.is_empty() {
                return Err(LexanError::EmptyPattern(Some(*handle)));
            }
            if handles.contains(handle) {
                return Err(LexanError::DuplicateHandle(*handle));
            }
            if seen_patterns.contains(pattern) {
                return Err(LexanError::DuplicatePattern(pattern));
            }
            handles.push(*handle);
            seen_patterns.push(*pattern);
            let anchored = format!("\\A(?:{})", pattern);
            lexemes.push((*handle, Regex::new(&anchored)?));
        }
        Ok(Self { lexemes })
    }

    /// Returns every handle whose pattern achieves the longest match at the
    /// start of `text`, together with the length of that match.
    fn longest_matches(&self, text: &str) -> (Vec<H>, usize) {
        let mut matches = vec![];
        let mut largest_end = 0;
        for (handle, regex) in self.lexemes.iter() {
            if let Some(m) = regex.find(text) {
                if m.end() == largest_end {
                    matches.push(*handle);
                } else if m.end() > largest_end {
                    largest_end = m.end();
                    matches = vec![*handle];
                }
            }
        }
        (matches, largest_end)
    }
}

#[derive(Debug)]
struct SkipMatcher {
    regexes: Vec<Regex>,
}

impl SkipMatcher {
    fn new<'a, H>(patterns: &[&'a str]) -> Result<Self, LexanError<'a, H>> {
        let mut regexes = vec![];
        for pattern in patterns.iter() {
            if pattern.is_empty() {
                return Err(LexanError::EmptyPattern(None));
            }
            regexes.push(Regex::new(&format!("\\A(?:{})", pattern))?);
        }
        Ok(Self { regexes })
    }

    /// Returns the number of skippable bytes at the start of `text`.
    fn skippable_count(&self, text: &str) -> usize {
        let mut index = 0;
        'outer: while index < text.len() {
            for regex in self.regexes.iter() {
                if let Some(m) = regex.find(&text[index..]) {
                    if m.end() == 0 {
                        continue;
                    }
                    index += m.end();
                    continue 'outer;
                }
            }
            break;
        }
        index
    }
}

/// A table-driven lexical analyzer: literal tokens are tried before regex
/// tokens; among matches of equal kind the longest match wins; when a regex
/// match is strictly longer than the best literal match, the regex wins.
#[derive(Debug)]
pub struct LexicalAnalyzer<H: Copy + Ord + Debug + Display> {
    literal_matcher: RegexMatcher<H>,
    regex_matcher: RegexMatcher<H>,
    skip_matcher: SkipMatcher,
    end_token: H,
}

impl<H: Copy + Ord + Debug + Display> LexicalAnalyzer<H> {
    pub fn new<'a>(
        literal_patterns: &[(H, &'a str)],
        regex_patterns: &[(H, &'a str)],
        skip_rules: &[&'a str],
        end_token: H,
    ) -> Result<Self, LexanError<'a, H>> {
        Ok(Self {
            literal_matcher: RegexMatcher::new_literal(literal_patterns)?,
            regex_matcher: RegexMatcher::new_regex(regex_patterns)?,
            skip_matcher: SkipMatcher::new(skip_rules)?,
            end_token,
        })
    }

    pub fn end_token(&self) -> H {
        self.end_token
    }

    fn skippable_count(&self, text: &str) -> usize {
        self.skip_matcher.skippable_count(text)
    }

    fn longest_literal_match(&self, text: &str) -> Option<(H, usize)> {
        let (matches, len) = self.literal_matcher.longest_matches(text);
        matches.first().map(|h| (*h, len))
    }

    fn longest_regex_matches(&self, text: &str) -> (Vec<H>, usize) {
        self.regex_matcher.longest_matches(text)
    }

    fn distance_to_next_valid_byte(&self, text: &str) -> usize {
        for (index, _) in text.char_indices().skip(1) {
            let rest = &text[index..];
            if self.skippable_count(rest) > 0
                || self.longest_literal_match(rest).is_some()
                || !self.longest_regex_matches(rest).0.is_empty()
            {
                return index;
            }
        }
        text.len()
    }

    pub fn tokenize(self: &Rc<Self>, text: String, label: &str) -> TokenStream<H> {
        TokenStream::new(self, text, label)
    }
}

struct BasicTokenStream<H: Copy + Ord + Debug + Display> {
    lexicon: Rc<LexicalAnalyzer<H>>,
    text: String,
    index: usize,
    location: Location,
    front: Option<Result<Token<H>, Error<H>>>,
}

impl<H: Copy + Ord + Debug + Display> BasicTokenStream<H> {
    fn new(lexicon: &Rc<LexicalAnalyzer<H>>, text: String, label: &str) -> Self {
        let mut stream = Self {
            lexicon: Rc::clone(lexicon),
            text,
            index: 0,
            location: Location::new(label),
            front: None,
        };
        stream.front = stream.next();
        stream
    }

    fn is_empty(&self) -> bool {
        self.front.is_none()
    }

    fn advance(&mut self) {
        self.front = self.next();
    }

    fn incr(&mut self, length: usize) {
        let next_index = self.index + length;
        self.location.advance(&self.text[self.index..next_index]);
        self.index = next_index;
    }

    fn next(&mut self) -> Option<Result<Token<H>, Error<H>>> {
        self.incr(self.lexicon.skippable_count(&self.text[self.index..]));
        if self.index >= self.text.len() {
            return None;
        }
        let current_location = self.location.clone();
        let start = self.index;
        let remaining = &self.text[self.index..];
        let o_llm = self.lexicon.longest_literal_match(remaining);
        let (regex_handles, regex_len) = self.lexicon.longest_regex_matches(remaining);

        let chosen = if let Some(llm) = o_llm {
            if regex_handles.len() > 1 && regex_len > llm.1 {
                Some(Err(regex_handles.clone()))
            } else if regex_handles.len() == 1 && regex_len > llm.1 {
                Some(Ok((regex_handles[0], regex_len)))
            } else {
                Some(Ok(llm))
            }
        } else if regex_handles.len() == 1 {
            Some(Ok((regex_handles[0], regex_len)))
        } else if regex_handles.len() > 1 {
            Some(Err(regex_handles.clone()))
        } else {
            None
        };

        match chosen {
            Some(Ok((handle, len))) => {
                self.incr(len);
                Some(Ok(Token {
                    tag: handle,
                    lexeme: self.text[start..self.index].to_string(),
                    location: current_location,
                }))
            }
            Some(Err(handles)) => {
                self.incr(regex_len);
                Some(Err(Error::AmbiguousMatches(
                    handles,
                    self.text[start..self.index].to_string(),
                    current_location,
                )))
            }
            None => {
                let distance = self.lexicon.distance_to_next_valid_byte(remaining);
                self.incr(distance.max(1));
                Some(Err(Error::UnexpectedText(
                    self.text[start..self.index].to_string(),
                    current_location,
                )))
            }
        }
    }
}

/// A stream of tokens with support for injecting nested text (e.g. macro
/// expansion) ahead of the current position.
pub struct TokenStream<H: Copy + Ord + Debug + Display> {
    lexicon: Rc<LexicalAnalyzer<H>>,
    stack: Vec<BasicTokenStream<H>>,
    front: Result<Token<H>, Error<H>>,
    end_location: Location,
}

impl<H: Copy + Ord + Debug + Display> TokenStream<H> {
    fn new(lexicon: &Rc<LexicalAnalyzer<H>>, text: String, label: &str) -> Self {
        let mut stream = Self {
            lexicon: Rc::clone(lexicon),
            stack: vec![],
            front: Err(Error::AdvancedWhenEmpty(Location::default())),
            end_location: Location::new(label),
        };
        stream.inject(text, label);
        stream
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn front(&self) -> Result<Token<H>, Error<H>> {
        self.front.clone()
    }

    /// Push `text` as a new innermost stream to be drained before resuming
    /// whatever was already on the stack.
    pub fn inject(&mut self, text: String, label: &str) {
        let basic = BasicTokenStream::new(&self.lexicon, text, label);
        if !basic.is_empty() {
            self.front = basic.front.clone().unwrap();
            self.stack.push(basic);
        }
    }

    pub fn advance(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            top.advance();
            if let Some(location) = top.front.as_ref().map(|_| top.location.clone()) {
                self.end_location = location;
            }
            while self.stack.last().map_or(false, |s| s.is_empty()) {
                self.stack.pop();
            }
            self.front = if let Some(top) = self.stack.last() {
                top.front.clone().unwrap()
            } else {
                Ok(Token {
                    tag: self.lexicon.end_token(),
                    lexeme: String::new(),
                    location: self.end_location.clone(),
                })
            };
        } else {
            self.front = Err(Error::AdvancedWhenEmpty(self.end_location.clone()));
        }
    }

    pub fn front_advance(&mut self) -> Result<Token<H>, Error<H>> {
        let front = self.front.clone();
        self.advance();
        front
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Tok {
        Plus,
        Num,
        End,
    }

    impl fmt::Display for Tok {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn analyzer() -> Rc<LexicalAnalyzer<Tok>> {
        Rc::new(
            LexicalAnalyzer::new(
                &[(Tok::Plus, "+")],
                &[(Tok::Num, r"[0-9]+")],
                &[r"[ \t\n]+"],
                Tok::End,
            )
            .unwrap(),
        )
    }

    #[test]
    fn location_display() {
        let location = Location {
            line_number: 10,
            offset: 15,
            label: "whatever".to_string(),
        };
        assert_eq!(format!("{}", location), "whatever:10:15");
        let location = Location {
            line_number: 9,
            offset: 23,
            label: "".to_string(),
        };
        assert_eq!(format!("{}", location), "9:23");
    }

    #[test]
    fn tokenizes_literal_and_regex() {
        let lexicon = analyzer();
        let mut stream = lexicon.tokenize("12 + 3".to_string(), "test");
        let t0 = stream.front_advance().unwrap();
        assert_eq!(*t0.tag(), Tok::Num);
        assert_eq!(t0.lexeme(), "12");
        let t1 = stream.front_advance().unwrap();
        assert_eq!(*t1.tag(), Tok::Plus);
        let t2 = stream.front_advance().unwrap();
        assert_eq!(*t2.tag(), Tok::Num);
        assert_eq!(t2.lexeme(), "3");
        let t3 = stream.front_advance().unwrap();
        assert_eq!(*t3.tag(), Tok::End);
    }

    #[test]
    fn reports_unexpected_text() {
        let lexicon = analyzer();
        let mut stream = lexicon.tokenize("@".to_string(), "test");
        let err = stream.front_advance().unwrap_err();
        assert!(matches!(err, Error::UnexpectedText(ref s, _) if s == "@"));
    }

    #[test]
    fn tracks_line_and_column() {
        let lexicon = analyzer();
        let mut stream = lexicon.tokenize("1\n22".to_string(), "f");
        let t0 = stream.front_advance().unwrap();
        assert_eq!(t0.location().line_number(), 1);
        let t1 = stream.front_advance().unwrap();
        assert_eq!(t1.location().line_number(), 2);
        assert_eq!(t1.location().offset(), 1);
    }
}
