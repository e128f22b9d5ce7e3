use crate::ranges::RangeSet;

/// Zero-width assertions. They constrain where a match may happen but consume nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assertion {
    /// `^`
    Start,
    /// `$`
    End,
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
}

/// A parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Matches the empty string, e.g. an empty alternative or `()`.
    Empty,
    Assertion(Assertion),
    Literal(char),
    Class(RangeSet),
    Concat(Vec<Node>),
    Alternation(Vec<Node>),
    Star(Box<Node>),
    Plus(Box<Node>),
    Optional(Box<Node>),
    /// `node{min,max}`, where a `max` of `None` is unbounded.
    Repeat {
        node: Box<Node>,
        min: u32,
        max: Option<u32>,
    },
}

impl Node {
    /// Whether this node matches the empty string.
    pub fn is_nullable(&self) -> bool {
        match self {
            Node::Empty | Node::Assertion(_) => true,
            Node::Literal(_) | Node::Class(_) => false,
            Node::Concat(items) => items.iter().all(Node::is_nullable),
            Node::Alternation(alternatives) => alternatives.iter().any(Node::is_nullable),
            Node::Star(_) | Node::Optional(_) => true,
            Node::Plus(inner) => inner.is_nullable(),
            Node::Repeat { node, min, .. } => *min == 0 || node.is_nullable(),
        }
    }

    /// The character set consumed by a leaf, or `None` for any other node.
    pub fn label(&self) -> Option<RangeSet> {
        match self {
            Node::Literal(c) => Some(RangeSet::from(*c)),
            Node::Class(set) => Some(set.clone()),
            _ => None,
        }
    }

    /// Whether this node contains at least one character-consuming leaf.
    pub fn has_symbols(&self) -> bool {
        match self {
            Node::Empty | Node::Assertion(_) => false,
            Node::Literal(_) | Node::Class(_) => true,
            Node::Concat(items) | Node::Alternation(items) => items.iter().any(Node::has_symbols),
            Node::Star(inner) | Node::Plus(inner) | Node::Optional(inner) => inner.has_symbols(),
            Node::Repeat { node, max, .. } => *max != Some(0) && node.has_symbols(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_pattern;

    #[test]
    fn nullable() {
        assert!(parse_pattern("").unwrap().is_nullable());
        assert!(!parse_pattern("a").unwrap().is_nullable());

        assert!(parse_pattern("a|").unwrap().is_nullable());
        assert!(!parse_pattern("a|b").unwrap().is_nullable());

        assert!(!parse_pattern("ab").unwrap().is_nullable());
        assert!(parse_pattern("a?b*").unwrap().is_nullable());

        assert!(parse_pattern("a*").unwrap().is_nullable());
        assert!(!parse_pattern("a+").unwrap().is_nullable());
        assert!(parse_pattern("(a?)+").unwrap().is_nullable());
        assert!(parse_pattern("a?").unwrap().is_nullable());
        assert!(parse_pattern("a{0,3}").unwrap().is_nullable());
        assert!(!parse_pattern("a{2,3}").unwrap().is_nullable());
        assert!(parse_pattern("^$").unwrap().is_nullable());
    }

    #[test]
    fn symbols() {
        assert!(parse_pattern("a").unwrap().has_symbols());
        assert!(!parse_pattern("(^)*").unwrap().has_symbols());
        assert!(!parse_pattern("(?:)").unwrap().has_symbols());
        assert!(!parse_pattern("a{0}").unwrap().has_symbols());
    }
}
