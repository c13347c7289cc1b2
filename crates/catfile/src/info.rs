//! Object metadata and the batch-protocol header parser.
//!
//! Both `cat-file --batch` and `cat-file --batch-check` answer every request
//! with one header line, `<oid> <kind> <size>\n`, or `<revspec> missing\n`
//! when the revspec resolves to nothing. This module owns that line format;
//! nothing else in the crate looks at header bytes.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest header line the parser accepts. Headers are short (an object id,
/// a kind and a decimal size), but `missing` lines echo the revspec back,
/// so the cap leaves generous room before declaring the stream corrupt.
pub const MAX_HEADER_LEN: u64 = 64 * 1024;

/// The four kinds of git object the batch protocol can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A commit object
    Commit,
    /// A tree object
    Tree,
    /// A blob object
    Blob,
    /// An annotated tag object
    Tag,
}

impl ObjectKind {
    /// The kind's wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "commit" => Ok(Self::Commit),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "tag" => Ok(Self::Tag),
            other => Err(Error::parse(format!("unknown object kind {other:?}"))),
        }
    }
}

/// Metadata for one object, as parsed from a batch-protocol header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object id, lowercase hex
    pub oid: String,
    /// Object kind
    pub kind: ObjectKind,
    /// Object size in bytes; the wire carries it as a signed decimal
    pub size: i64,
}

impl ObjectInfo {
    /// The canonical header line for this object, trailing newline included.
    #[must_use]
    pub fn format_header(&self) -> String {
        format!("{} {} {}\n", self.oid, self.kind, self.size)
    }

    /// Whether this object is a commit.
    #[must_use]
    pub fn is_commit(&self) -> bool {
        self.kind == ObjectKind::Commit
    }

    /// Whether this object is a tree.
    #[must_use]
    pub fn is_tree(&self) -> bool {
        self.kind == ObjectKind::Tree
    }

    /// Whether this object is a blob.
    #[must_use]
    pub fn is_blob(&self) -> bool {
        self.kind == ObjectKind::Blob
    }

    /// Whether this object is an annotated tag.
    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.kind == ObjectKind::Tag
    }
}

/// Parse one header line.
///
/// The trailing newline is optional. A line ending in ` missing` yields
/// [`Error::ObjectNotFound`]; anything that is not exactly three
/// space-separated fields with a decimal third field is a parse error.
/// Never panics, whatever the input.
pub fn parse_header(line: &[u8]) -> Result<ObjectInfo> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let text = std::str::from_utf8(line)
        .map_err(|_| Error::parse("header line is not valid UTF-8"))?;

    if let Some(revspec) = text.strip_suffix(" missing") {
        return Err(Error::not_found(revspec));
    }

    let fields: Vec<&str> = text.split(' ').collect();
    let [oid, kind, size] = fields.as_slice() else {
        return Err(Error::parse(format!(
            "expected 3 fields, got {}: {text:?}",
            fields.len()
        )));
    };

    let kind = kind.parse::<ObjectKind>()?;
    let size = size
        .parse::<i64>()
        .map_err(|_| Error::parse(format!("invalid object size {size:?}")))?;

    Ok(ObjectInfo {
        oid: (*oid).to_string(),
        kind,
        size,
    })
}

/// Read one header line from a subprocess stdout and parse it.
///
/// Consumes exactly the header line and nothing beyond it. EOF before the
/// newline is a pipe error (the subprocess died mid-response); a line
/// longer than [`MAX_HEADER_LEN`] is a parse error.
pub(crate) async fn read_header<R>(reader: &mut R) -> Result<ObjectInfo>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut line = Vec::with_capacity(64);
    let n = (&mut *reader)
        .take(MAX_HEADER_LEN)
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| Error::pipe("read header line", e))?;

    if n == 0 {
        return Err(Error::pipe(
            "read header line",
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no header line"),
        ));
    }
    if !line.ends_with(b"\n") {
        if n as u64 == MAX_HEADER_LEN {
            return Err(Error::parse("header line exceeds maximum length"));
        }
        return Err(Error::pipe(
            "read header line",
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated header line"),
        ));
    }

    parse_header(&line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_headers() {
        for (kind_str, kind) in [
            ("commit", ObjectKind::Commit),
            ("tree", ObjectKind::Tree),
            ("blob", ObjectKind::Blob),
            ("tag", ObjectKind::Tag),
        ] {
            let line = format!("7c9373883988a76a7f1fd39cb63b8a44b4a62fc2 {kind_str} 1234\n");
            let info = parse_header(line.as_bytes()).expect("valid header");
            assert_eq!(info.oid, "7c9373883988a76a7f1fd39cb63b8a44b4a62fc2");
            assert_eq!(info.kind, kind);
            assert_eq!(info.size, 1234);
        }
    }

    #[test]
    fn test_parse_without_trailing_newline() {
        let info = parse_header(b"abc blob 6").expect("valid header");
        assert_eq!(info.size, 6);
    }

    #[test]
    fn test_missing_is_not_found() {
        let err = parse_header(b"refs/heads/nope missing\n").unwrap_err();
        assert!(err.is_not_found());
        match err {
            Error::ObjectNotFound { revspec } => assert_eq!(revspec, "refs/heads/nope"),
            other => panic!("expected ObjectNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_missing_line() {
        // `<anything> missing`: the revspec part may itself contain spaces
        let err = parse_header(b"some weird revspec missing\n").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_wrong_arity_is_parse_error() {
        for line in [&b"abc blob"[..], b"abc blob 12 extra", b"", b"abc  blob 12"] {
            let err = parse_header(line).unwrap_err();
            assert!(matches!(err, Error::Parse { .. }), "line {line:?}");
        }
    }

    #[test]
    fn test_bad_size_is_parse_error() {
        let err = parse_header(b"abc blob twelve\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_negative_size_parses() {
        // The wire field is signed; rejecting negatives is the channel's job
        let info = parse_header(b"abc blob -1\n").expect("signed size");
        assert_eq!(info.size, -1);
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let err = parse_header(b"abc blobby 12\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_header_roundtrip() {
        let info = ObjectInfo {
            oid: "1234567890abcdef1234567890abcdef12345678".into(),
            kind: ObjectKind::Tag,
            size: 42,
        };
        let reparsed = parse_header(info.format_header().as_bytes()).expect("roundtrip");
        assert_eq!(reparsed, info);
    }

    #[tokio::test]
    async fn test_read_header_consumes_one_line() {
        let input = b"abc blob 6\nhello\n".to_vec();
        let mut reader = std::io::Cursor::new(input);
        let info = read_header(&mut reader).await.expect("header");
        assert_eq!(info.size, 6);
        assert_eq!(reader.position(), 11);
    }

    #[tokio::test]
    async fn test_read_header_eof_is_pipe_error() {
        let mut reader = std::io::Cursor::new(b"abc blob 6".to_vec());
        let err = read_header(&mut reader).await.unwrap_err();
        assert!(err.is_pipe());

        let mut reader = std::io::Cursor::new(Vec::new());
        let err = read_header(&mut reader).await.unwrap_err();
        assert!(err.is_pipe());
    }
}
