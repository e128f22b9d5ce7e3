use crate::ast::{Assertion, Node};
use crate::ranges::{Range, RangeSet, MAX_CODE_POINT};
use crate::ParseErrorKind::*;
use crate::{ParseError, ParseErrorKind};
use std::ops::RangeInclusive;
use winnow::ascii::digit1;
use winnow::combinator::opt;
use winnow::prelude::*;
use winnow::token::{any, take_while};

/// Consumes `token` if the input starts with it.
fn eat(input: &mut &str, token: &'static str) -> bool {
    let eaten: PResult<Option<&str>> = opt(token).parse_next(input);
    matches!(eaten, Ok(Some(_)))
}

fn next_char(input: &mut &str) -> PResult<char> {
    any.parse_next(input)
}

fn decimal<'i>(input: &mut &'i str) -> PResult<&'i str> {
    digit1.parse_next(input)
}

enum Upper<'i> {
    /// `{n}`
    Same,
    /// `{n,}`
    Unbounded,
    /// `{n,m}`
    Bounded(&'i str),
}

/// Scans `{n}`, `{n,}` or `{n,m}`. The input only advances when the whole quantifier
/// is there; anything else leaves the `{` to be read as a literal.
fn scan_braces<'i>(input: &mut &'i str) -> Option<(&'i str, Upper<'i>)> {
    let mut probe = *input;
    if !eat(&mut probe, "{") {
        return None;
    }
    let min = decimal(&mut probe).ok()?;
    let max = if eat(&mut probe, ",") {
        match decimal(&mut probe) {
            Ok(digits) => Upper::Bounded(digits),
            Err(_) => Upper::Unbounded,
        }
    } else {
        Upper::Same
    };
    if !eat(&mut probe, "}") {
        return None;
    }

    *input = probe;
    Some((min, max))
}

/// Splits a `/body/flags` literal into its body and the offset the body starts at.
fn split_literal(pattern: &str) -> Result<(&str, usize), ParseError> {
    let Some(rest) = pattern.strip_prefix('/') else {
        return Ok((pattern, 0));
    };
    let Some(close) = rest.rfind('/') else {
        return Ok((pattern, 0));
    };
    let (body, flags) = (&rest[..close], &rest[close + 1..]);
    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok((pattern, 0));
    }

    for (i, flag) in flags.char_indices() {
        let at = close + 2 + i;
        match flag {
            'g' => {}
            'i' | 'm' | 's' | 'u' | 'y' | 'd' | 'v' => {
                return Err(ParseError::new(UnsupportedModifier, at).with_code_point(flag as u32))
            }
            _ => return Err(ParseError::new(CouldNotTokenize, at).with_code_point(flag as u32)),
        }
    }

    Ok((body, 1))
}

enum Term {
    Assertion(Assertion),
    Atom(Node),
}

enum Escaped {
    Char(u32),
    Set(RangeSet),
}

impl Escaped {
    fn into_set(self) -> RangeSet {
        match self {
            Escaped::Char(code_point) => RangeSet::from(Range::single(code_point)),
            Escaped::Set(set) => set,
        }
    }
}

fn literal(code_point: u32) -> Node {
    char::from_u32(code_point).map_or_else(
        || Node::Class(RangeSet::from(Range::single(code_point))),
        Node::Literal,
    )
}

struct PatternParser<'a> {
    input: &'a str,
    /// offset in the full pattern at which the body ends
    end: usize,
}

impl PatternParser<'_> {
    fn offset(&self) -> usize {
        self.end - self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.chars().next()
    }

    fn error(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        let error = ParseError::new(kind, offset);
        match self.peek() {
            Some(c) if offset == self.offset() => error.with_code_point(c as u32),
            _ => error,
        }
    }

    fn at_quantifier(&self) -> bool {
        let mut probe = self.input;
        matches!(self.peek(), Some('*' | '+' | '?')) || scan_braces(&mut probe).is_some()
    }

    fn parse_disjunction(&mut self) -> Result<Node, ParseError> {
        let mut alternatives = vec![self.parse_alternative()?];
        while eat(&mut self.input, "|") {
            alternatives.push(self.parse_alternative()?);
        }

        Ok(match alternatives.len() {
            1 => alternatives.remove(0),
            _ => Node::Alternation(alternatives),
        })
    }

    fn parse_alternative(&mut self) -> Result<Node, ParseError> {
        let mut terms = Vec::new();
        while !matches!(self.peek(), None | Some('|' | ')')) {
            terms.push(self.parse_term()?);
        }

        Ok(match terms.len() {
            0 => Node::Empty,
            1 => terms.remove(0),
            _ => Node::Concat(terms),
        })
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        match self.parse_atom()? {
            Term::Assertion(assertion) => {
                if self.at_quantifier() {
                    return Err(self.error(NothingToRepeat, self.offset()));
                }
                Ok(Node::Assertion(assertion))
            }
            Term::Atom(atom) => self.parse_quantifier(atom),
        }
    }

    fn parse_atom(&mut self) -> Result<Term, ParseError> {
        let at = self.offset();
        if self.at_quantifier() {
            return Err(self.error(NothingToRepeat, at));
        }
        let c = next_char(&mut self.input).map_err(|_| ParseError::new(CouldNotTokenize, at))?;

        Ok(match c {
            '^' => Term::Assertion(Assertion::Start),
            '$' => Term::Assertion(Assertion::End),
            '.' => Term::Atom(Node::Class(RangeSet::any_but_newline())),
            '(' => Term::Atom(self.parse_group(at)?),
            '[' => Term::Atom(self.parse_class(at)?),
            '\\' => self.parse_escape(at)?,
            c => Term::Atom(Node::Literal(c)),
        })
    }

    fn parse_group(&mut self, open: usize) -> Result<Node, ParseError> {
        if eat(&mut self.input, "?") {
            self.parse_group_kind(open)?;
        }

        let inner = self.parse_disjunction()?;
        if !eat(&mut self.input, ")") {
            return Err(ParseError::new(UnbalancedParenthesis, open));
        }
        Ok(inner)
    }

    /// Checks what follows `(?`. Only non-capturing and named groups are supported.
    fn parse_group_kind(&mut self, open: usize) -> Result<(), ParseError> {
        if eat(&mut self.input, ":") {
            return Ok(());
        }

        if eat(&mut self.input, "<") {
            if matches!(self.peek(), Some('=' | '!')) {
                return Err(ParseError::new(UnsupportedGroup, open));
            }
            let name: PResult<&str> = take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_')
                .parse_next(&mut self.input);
            if name.is_err() {
                return Err(self.error(CouldNotTokenize, self.offset()));
            }
            return match self.peek() {
                Some('>') => {
                    eat(&mut self.input, ">");
                    Ok(())
                }
                // balancing group `(?<a-b>...)`
                Some('-') => Err(ParseError::new(UnsupportedGroup, open)),
                _ => Err(self.error(CouldNotTokenize, self.offset())),
            };
        }

        match self.peek() {
            Some('=' | '!' | '>' | '(' | '#' | '|') => Err(ParseError::new(UnsupportedGroup, open)),
            Some('i' | 'm' | 's' | 'x' | 'n' | 'u' | 'U' | '-' | '^') => {
                Err(ParseError::new(UnsupportedModifier, open))
            }
            _ => Err(self.error(CouldNotTokenize, self.offset())),
        }
    }

    fn parse_quantifier(&mut self, atom: Node) -> Result<Node, ParseError> {
        let at = self.offset();
        let node = if eat(&mut self.input, "*") {
            Node::Star(Box::new(atom))
        } else if eat(&mut self.input, "+") {
            Node::Plus(Box::new(atom))
        } else if eat(&mut self.input, "?") {
            Node::Optional(Box::new(atom))
        } else if let Some((min, max)) = scan_braces(&mut self.input) {
            let (min, max) = bounds(min, max, at)?;
            Node::Repeat {
                node: Box::new(atom),
                min,
                max,
            }
        } else {
            return Ok(atom);
        };

        let suffix = self.offset();
        if eat(&mut self.input, "+") {
            return Err(ParseError::new(UnsupportedPossessive, suffix));
        }
        // laziness only changes which match is reported first
        eat(&mut self.input, "?");
        if self.at_quantifier() {
            return Err(self.error(NothingToRepeat, self.offset()));
        }

        Ok(node)
    }

    fn parse_escape(&mut self, at: usize) -> Result<Term, ParseError> {
        let c = next_char(&mut self.input).map_err(|_| ParseError::new(CouldNotTokenize, at))?;
        match c {
            'b' => Ok(Term::Assertion(Assertion::WordBoundary)),
            'B' => Ok(Term::Assertion(Assertion::NotWordBoundary)),
            '1'..='9' | 'k' => {
                Err(ParseError::new(InvalidBackreference, at).with_code_point(c as u32))
            }
            c => Ok(Term::Atom(match self.parse_char_escape(c, at)? {
                Escaped::Char(code_point) => literal(code_point),
                Escaped::Set(set) => Node::Class(set),
            })),
        }
    }

    /// Escapes shared by classes and plain atoms. `c` is the character after the backslash.
    fn parse_char_escape(&mut self, c: char, at: usize) -> Result<Escaped, ParseError> {
        let unsupported = || ParseError::new(UnsupportedEscape, at).with_code_point(c as u32);

        Ok(match c {
            'd' => Escaped::Set(RangeSet::digit()),
            'D' => Escaped::Set(RangeSet::digit().complement()),
            'w' => Escaped::Set(RangeSet::word()),
            'W' => Escaped::Set(RangeSet::word().complement()),
            's' => Escaped::Set(RangeSet::space()),
            'S' => Escaped::Set(RangeSet::space().complement()),
            't' => Escaped::Char(0x09),
            'n' => Escaped::Char(0x0A),
            'v' => Escaped::Char(0x0B),
            'f' => Escaped::Char(0x0C),
            'r' => Escaped::Char(0x0D),
            '0' => Escaped::Char(0),
            'x' => Escaped::Char(self.hex(2..=2).ok_or_else(unsupported)?),
            'u' => {
                let code_point = if eat(&mut self.input, "{") {
                    let code_point = self.hex(1..=6);
                    if !eat(&mut self.input, "}") {
                        return Err(unsupported());
                    }
                    code_point
                } else {
                    self.hex(4..=4)
                };
                match code_point {
                    Some(code_point) if code_point <= MAX_CODE_POINT => Escaped::Char(code_point),
                    _ => return Err(unsupported()),
                }
            }
            'c' => match next_char(&mut self.input) {
                Ok(letter) if letter.is_ascii_alphabetic() => Escaped::Char(letter as u32 % 32),
                _ => return Err(unsupported()),
            },
            c if !c.is_ascii_alphanumeric() => Escaped::Char(c as u32),
            _ => return Err(unsupported()),
        })
    }

    fn hex(&mut self, digits: RangeInclusive<usize>) -> Option<u32> {
        let text: PResult<&str> =
            take_while(digits, |c: char| c.is_ascii_hexdigit()).parse_next(&mut self.input);
        u32::from_str_radix(text.ok()?, 16).ok()
    }

    fn parse_class(&mut self, open: usize) -> Result<Node, ParseError> {
        let negated = eat(&mut self.input, "^");
        let mut members = RangeSet::empty();

        loop {
            let at = self.offset();
            let c = next_char(&mut self.input).map_err(|_| ParseError::new(IncompleteRange, open))?;
            if c == ']' {
                break;
            }
            let low = self.parse_class_atom(c, at, open)?;

            let is_range = self.input.len() > 1
                && self.input.starts_with('-')
                && !self.input.starts_with("-]");
            if !is_range {
                members = members.union(&low.into_set());
                continue;
            }

            eat(&mut self.input, "-");
            let high_at = self.offset();
            let c = next_char(&mut self.input).map_err(|_| ParseError::new(IncompleteRange, open))?;
            match (low, self.parse_class_atom(c, high_at, open)?) {
                (Escaped::Char(from), Escaped::Char(to)) => {
                    if from > to {
                        return Err(ParseError::new(OutOfOrder, at));
                    }
                    members = members.union(&RangeSet::from(Range::new(from, to)));
                }
                // `[\d-z]` is a set, a dash and a character
                (low, high) => {
                    for part in [low, Escaped::Char('-' as u32), high] {
                        members = members.union(&part.into_set());
                    }
                }
            }
        }

        Ok(Node::Class(if negated {
            members.complement()
        } else {
            members
        }))
    }

    fn parse_class_atom(&mut self, c: char, at: usize, open: usize) -> Result<Escaped, ParseError> {
        if c != '\\' {
            return Ok(Escaped::Char(c as u32));
        }
        let c = next_char(&mut self.input).map_err(|_| ParseError::new(IncompleteRange, open))?;
        match c {
            // backspace, inside a class only
            'b' => Ok(Escaped::Char(0x08)),
            c => self.parse_char_escape(c, at),
        }
    }
}

fn bounds(min: &str, max: Upper<'_>, at: usize) -> Result<(u32, Option<u32>), ParseError> {
    let count = |digits: &str| {
        digits
            .parse::<u32>()
            .map_err(|_| ParseError::new(CouldNotTokenize, at))
    };

    let min = count(min)?;
    let max = match max {
        Upper::Same => Some(min),
        Upper::Unbounded => None,
        Upper::Bounded(digits) => Some(count(digits)?),
    };
    if max.is_some_and(|max| max < min) {
        return Err(ParseError::new(OutOfOrder, at));
    }

    Ok((min, max))
}

pub(crate) fn parse(pattern: &str) -> Result<Node, ParseError> {
    if let Some((offset, c)) = pattern.char_indices().find(|(_, c)| !c.is_ascii()) {
        return Err(ParseError::new(NonAscii, offset).with_code_point(c as u32));
    }

    let (body, start) = split_literal(pattern)?;
    let mut parser = PatternParser {
        input: body,
        end: start + body.len(),
    };

    let node = parser.parse_disjunction()?;
    if !parser.input.is_empty() {
        // a disjunction only stops early at a `)` that was never opened
        return Err(parser.error(UnbalancedParenthesis, parser.offset()));
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use crate::{parse_pattern, Node, ParseErrorKind, RangeSet};
    use pretty_assertions::assert_eq;

    fn lit(c: char) -> Node {
        Node::Literal(c)
    }

    #[test]
    fn test_symbols() {
        assert_eq!(parse_pattern("a").unwrap(), lit('a'));
        assert_eq!(parse_pattern("").unwrap(), Node::Empty);
        assert_eq!(parse_pattern("\\x41").unwrap(), lit('A'));
        assert_eq!(parse_pattern("\\u0041").unwrap(), lit('A'));
        assert_eq!(parse_pattern("\\u{1F600}").unwrap(), lit('\u{1F600}'));
        assert_eq!(parse_pattern("\\cJ").unwrap(), lit('\n'));
        assert_eq!(parse_pattern("\\.").unwrap(), lit('.'));
        assert_eq!(
            parse_pattern(".").unwrap(),
            Node::Class(RangeSet::any_but_newline())
        );
        assert_eq!(parse_pattern("\\d").unwrap(), Node::Class(RangeSet::digit()));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            parse_pattern("ab|c").unwrap(),
            Node::Alternation(vec![Node::Concat(vec![lit('a'), lit('b')]), lit('c')])
        );
        assert_eq!(
            parse_pattern("a*b+?c?").unwrap(),
            Node::Concat(vec![
                Node::Star(Box::new(lit('a'))),
                Node::Plus(Box::new(lit('b'))),
                Node::Optional(Box::new(lit('c'))),
            ])
        );
        assert_eq!(
            parse_pattern("(?:ab)*").unwrap(),
            Node::Star(Box::new(Node::Concat(vec![lit('a'), lit('b')])))
        );
        assert_eq!(
            parse_pattern("(?<year>a)").unwrap(),
            lit('a')
        );
        assert_eq!(parse_pattern("a|").unwrap(), Node::Alternation(vec![lit('a'), Node::Empty]));
    }

    #[test]
    fn test_bounded_repetition() {
        let repeat = |min, max| Node::Repeat {
            node: Box::new(lit('a')),
            min,
            max,
        };
        assert_eq!(parse_pattern("a{2}").unwrap(), repeat(2, Some(2)));
        assert_eq!(parse_pattern("a{2,}").unwrap(), repeat(2, None));
        assert_eq!(parse_pattern("a{2,5}").unwrap(), repeat(2, Some(5)));
        // not a quantifier, so plain characters
        assert_eq!(
            parse_pattern("a{,2}").unwrap(),
            Node::Concat(vec![lit('a'), lit('{'), lit(','), lit('2'), lit('}')])
        );
    }

    #[test]
    fn test_classes() {
        assert_eq!(
            parse_pattern("[a-c]").unwrap(),
            Node::Class(RangeSet::range('a', 'c'))
        );
        assert_eq!(
            parse_pattern("[^a]").unwrap(),
            Node::Class(RangeSet::from('a').complement())
        );
        assert_eq!(
            parse_pattern("[a-]").unwrap(),
            Node::Class(RangeSet::from('a').union(&RangeSet::from('-')))
        );
        assert_eq!(
            parse_pattern("[\\d-z]").unwrap(),
            Node::Class(
                RangeSet::digit()
                    .union(&RangeSet::from('-'))
                    .union(&RangeSet::from('z'))
            )
        );
        assert_eq!(parse_pattern("[]").unwrap(), Node::Class(RangeSet::empty()));
        assert_eq!(parse_pattern("[^]").unwrap(), Node::Class(RangeSet::all()));
        assert_eq!(parse_pattern("[\\b]").unwrap(), lit_class(0x08));
    }

    fn lit_class(code_point: u32) -> Node {
        Node::Class(RangeSet::from(crate::Range::single(code_point)))
    }

    #[test]
    fn test_literal_form() {
        assert_eq!(parse_pattern("/a/").unwrap(), lit('a'));
        assert_eq!(parse_pattern("/a/g").unwrap(), lit('a'));
        assert_eq!(
            parse_pattern("/a/b/").unwrap(),
            Node::Concat(vec![lit('a'), lit('/'), lit('b')])
        );
        assert_eq!(parse_pattern("/").unwrap(), lit('/'));
    }

    #[test]
    fn test_rejections() {
        use ParseErrorKind::*;

        let cases = [
            ("(?=a)", UnsupportedGroup, 0),
            ("a(?<!b)", UnsupportedGroup, 1),
            ("(?>a)", UnsupportedGroup, 0),
            ("(?(1)a|b)", UnsupportedGroup, 0),
            ("(?<a-b>c)", UnsupportedGroup, 0),
            ("(?i)a", UnsupportedModifier, 0),
            ("x(?i:a)", UnsupportedModifier, 1),
            ("/a/i", UnsupportedModifier, 3),
            ("\\p{L}", UnsupportedEscape, 0),
            ("a\\Z", UnsupportedEscape, 1),
            ("\\xZZ", UnsupportedEscape, 0),
            ("(a)\\1", InvalidBackreference, 3),
            ("(?<n>a)\\k<n>", InvalidBackreference, 7),
            ("[a-", IncompleteRange, 0),
            ("ab[cd", IncompleteRange, 2),
            ("[z-a]", OutOfOrder, 1),
            ("a{3,2}", OutOfOrder, 1),
            ("a++", UnsupportedPossessive, 2),
            ("a{2}+", UnsupportedPossessive, 4),
            ("*a", NothingToRepeat, 0),
            ("a|?", NothingToRepeat, 2),
            ("^*", NothingToRepeat, 1),
            ("a**", NothingToRepeat, 2),
            ("(a", UnbalancedParenthesis, 0),
            ("a)", UnbalancedParenthesis, 1),
            ("/a/q", CouldNotTokenize, 3),
            ("a\\", CouldNotTokenize, 1),
        ];

        for (pattern, kind, offset) in cases {
            let error = parse_pattern(pattern).unwrap_err();
            assert_eq!((pattern, error.kind, error.offset), (pattern, kind, offset));
        }
    }

    #[test]
    fn test_non_ascii() {
        let error = parse_pattern("ab\u{e9}").unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::NonAscii);
        assert_eq!(error.offset, 2);
        assert_eq!(error.code_point, Some(0xE9));

        // escapes may still name any code point
        assert!(parse_pattern("\\u00e9").is_ok());
    }
}
