//! Fuzz target for the batch-protocol header parser.
//!
//! The parser consumes raw subprocess output; a corrupted pipe can feed it
//! arbitrary bytes. The invariant under test:
//!   parse_header never panics, and classifies every input as exactly one
//!   of parsed / not-found / parse-error.
//!
//! # Input Format
//!
//! The fuzzer input is used verbatim as one header line (with or without a
//! trailing newline).
//!
//! # Running
//!
//! ```bash
//! # Install cargo-fuzz (one-time)
//! cargo install cargo-fuzz
//!
//! # Run the fuzzer
//! cargo +nightly fuzz run fuzz_header_parse
//!
//! # Run with a limit
//! cargo +nightly fuzz run fuzz_header_parse -- -runs=100000
//! ```

#![no_main]

use gitmux_catfile::{Error, parse_header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match parse_header(data) {
        Ok(info) => {
            // whatever parsed must format back into a parseable header
            let line = info.format_header();
            let reparsed = parse_header(line.as_bytes()).expect("formatted header must parse");
            assert_eq!(reparsed, info);
        }
        Err(Error::ObjectNotFound { .. } | Error::Parse { .. }) => {}
        Err(other) => panic!("unexpected error kind from parser: {other:?}"),
    }
});
