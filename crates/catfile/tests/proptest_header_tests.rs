//! Property-based tests for the batch-protocol header parser.
//!
//! The parser sits directly on subprocess output: a corrupted pipe can
//! feed it anything, so beyond the usual round-trip contract it must never
//! panic, whatever the input.

use gitmux_catfile::{Error, ObjectInfo, ObjectKind, parse_header};
use proptest::prelude::*;

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Generate a SHA1-like object id
fn oid_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{40}".prop_map(String::from)
}

fn kind_strategy() -> impl Strategy<Value = ObjectKind> {
    prop_oneof![
        Just(ObjectKind::Commit),
        Just(ObjectKind::Tree),
        Just(ObjectKind::Blob),
        Just(ObjectKind::Tag),
    ]
}

/// Generate a valid ObjectInfo
fn info_strategy() -> impl Strategy<Value = ObjectInfo> {
    (oid_strategy(), kind_strategy(), 0i64..=i64::MAX).prop_map(|(oid, kind, size)| ObjectInfo {
        oid,
        kind,
        size,
    })
}

/// Generate revspec-like strings without protocol-reserved bytes
fn revspec_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./^{}:~-]{1,60}".prop_map(String::from)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    /// Contract: formatting an info and parsing it back is the identity
    #[test]
    fn header_roundtrips(info in info_strategy()) {
        let line = info.format_header();
        let reparsed = parse_header(line.as_bytes()).expect("formatted header must parse");
        prop_assert_eq!(reparsed, info);
    }

    /// Contract: the parser never panics, whatever bytes the pipe carries
    #[test]
    fn parser_never_panics(line in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_header(&line);
    }

    /// Contract: a ` missing` suffix always classifies as not-found, and
    /// the not-found error carries the echoed revspec
    #[test]
    fn missing_lines_are_not_found(revspec in revspec_strategy()) {
        let line = format!("{revspec} missing\n");
        let err = parse_header(line.as_bytes()).expect_err("missing lines never parse");
        prop_assert!(err.is_not_found());
        match err {
            Error::ObjectNotFound { revspec: echoed } => prop_assert_eq!(echoed, revspec),
            other => prop_assert!(false, "expected ObjectNotFound, got {other:?}"),
        }
    }

    /// Contract: junk that is neither a header nor a missing line is a
    /// parse error, never a not-found
    #[test]
    fn junk_is_a_parse_error(word in "[a-zA-Z0-9]{1,20}") {
        let err = parse_header(word.as_bytes()).expect_err("one field never parses");
        prop_assert!(matches!(err, Error::Parse { .. }), "expected Parse error");
    }
}
