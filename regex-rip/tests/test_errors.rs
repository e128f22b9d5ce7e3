use regex_rip::*;

macro_rules! assert_matches {
    ($expression:expr, $pattern:pat $(if $guard:expr)? $(,)?) => {
        match $expression {
            $pattern $(if $guard)? => {}
            outcome => assert!(false, "expected {:?} to match {}", outcome, stringify!($pattern $(if $guard)?))
        }
    };
}

fn kind(pattern: &str) -> ParseErrorKind {
    match compile(pattern) {
        Err(CompileError::Parse(error)) => error.kind,
        other => panic!("expected {pattern} to be rejected, got {other:?}"),
    }
}

#[test]
fn test_rejected_constructs() {
    use ParseErrorKind::*;

    let cases = [
        ("(?=a)b", UnsupportedGroup),
        ("(?!a)b", UnsupportedGroup),
        ("(?<=a)b", UnsupportedGroup),
        ("(?<!a)b", UnsupportedGroup),
        ("(a)\\1", InvalidBackreference),
        ("(?<x>a)\\k<x>", InvalidBackreference),
        ("(?i)abc", UnsupportedModifier),
        ("/abc/i", UnsupportedModifier),
        ("/abc/m", UnsupportedModifier),
        ("a*+", UnsupportedPossessive),
        ("a?+", UnsupportedPossessive),
        ("caf\u{e9}", NonAscii),
        ("\\p{Lu}", UnsupportedEscape),
        ("[abc", IncompleteRange),
        ("(abc", UnbalancedParenthesis),
        ("+", NothingToRepeat),
        ("/abc/%", CouldNotTokenize),
    ];

    for (pattern, expected) in cases {
        assert_eq!(kind(pattern), expected, "{pattern}");
    }
}

#[test]
fn test_error_details() {
    assert_matches!(
        compile("ab\u{1F600}"),
        Err(CompileError::Parse(ParseError {
            kind: ParseErrorKind::NonAscii,
            offset: 2,
            code_point: Some(0x1F600),
        }))
    );

    let error = compile("x(?=y)").unwrap_err();
    assert_eq!(
        error.to_string(),
        "parse error: unsupported grouping construct at offset 1"
    );
}

#[test]
fn test_state_limit() {
    assert_matches!(
        compile("(a{100}){100}"),
        Err(CompileError::TooManyStates { limit: 10_000 })
    );
    assert_eq!(compile("(a{100}){99}").unwrap().state_count(), 9_901);

    let options = CompileOptions::default().with_max_states(20_000);
    assert_eq!(
        compile_with("(a{100}){100}", &options).unwrap().state_count(),
        10_001
    );
    assert_eq!(
        compile_with("a{3}", &CompileOptions::default().with_max_states(3))
            .unwrap_err()
            .to_string(),
        "pattern needs more than 3 states"
    );
}

#[test]
fn test_edge_limit() {
    assert_matches!(
        compile("(?:a?){9999}"),
        Err(CompileError::TooManyEdges { limit: 100_000 })
    );
    // a chain of mandatory copies stays linear
    assert_eq!(compile("(?:ab){2000}").unwrap().state_count(), 4_001);
    assert_eq!(
        compile_with("(?:a?){3}", &CompileOptions::default().with_max_edges(2))
            .unwrap_err()
            .to_string(),
        "pattern needs more than 2 edges"
    );
}
