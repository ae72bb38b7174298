// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! The core's error taxonomy (spec §7).
//!
//! Five kinds, never conflated: format errors (a segment's on-disk bytes are
//! wrong), configuration errors (the caller asked for something that doesn't
//! exist), query errors (the caller's query tree can't be evaluated as
//! written), I/O errors (propagated unchanged from the underlying reader),
//! and cancellation (a distinct kind, never mistaken for the other four).
//!
//! No `thiserror`. Hand-rolled enums with a manual `Display` keep the error
//! messages exactly as specific as we want them, and keep this crate's
//! dependency surface as small as the rest of the core.

use std::fmt;
use std::io;

/// Top-level error type returned by every fallible operation in the core.
#[derive(Debug)]
pub enum Error {
    /// A segment's on-disk bytes violate the format (§6.2): bad header,
    /// bad checksum, unknown codec tag, corrupted offset. Fatal for the
    /// containing segment.
    Format(FormatError),
    /// The caller asked for a sensitivity, field, or rewrite that doesn't
    /// exist or can't be satisfied. Surfaced before query execution.
    Config(ConfigError),
    /// The query tree, as written, can't be evaluated (`noEmpty()` on an
    /// empty-only node, unbounded negation, and similar).
    Query(QueryError),
    /// Propagated unchanged from the underlying reader.
    Io(io::Error),
    /// The caller's cancellation token was observed set between iterator
    /// calls. Never confused with I/O or format errors (§7).
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(e) => write!(f, "format error: {e}"),
            Error::Config(e) => write!(f, "configuration error: {e}"),
            Error::Query(e) => write!(f, "query error: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Format(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Query(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Cancelled => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        Error::Format(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Error::Query(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Format errors: the containing segment refuses to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Header magic didn't match the expected 4 bytes.
    BadMagic { expected: [u8; 4], found: [u8; 4] },
    /// Header version is newer (or simply different) than this reader knows.
    UnsupportedVersion { found: u8, max_supported: u8 },
    /// The footer's CRC32 doesn't match the computed checksum (Q2).
    ChecksumMismatch { expected: u32, computed: u32 },
    /// The footer's magic bytes are missing or wrong — file is truncated
    /// or corrupted past the point a checksum alone would catch.
    BadFooterMagic,
    /// An extension file's `delegate_name` doesn't match the delegate this
    /// reader was constructed against.
    DelegateMismatch { expected: String, found: String },
    /// A `.tokensindex` entry named a codec tag this reader doesn't know.
    UnknownCodecTag(u8),
    /// A `.tokensindex` entry named a `VALUE_PER_TOKEN` width this reader
    /// doesn't know.
    UnknownTokenWidth(u8),
    /// An offset read from an index file points outside its target file.
    OffsetOutOfRange {
        field: &'static str,
        offset: i64,
        file_len: u64,
    },
    /// A length-prefixed string or array claimed a length it can't have
    /// given the remaining bytes (corruption, or a hostile file).
    TruncatedSection { section: &'static str },
    /// A varint exceeded the maximum permitted encoded length.
    VarintTooLong,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic { expected, found } => write!(
                f,
                "bad magic: expected {expected:?}, found {found:?}"
            ),
            FormatError::UnsupportedVersion {
                found,
                max_supported,
            } => write!(
                f,
                "unsupported format version {found} (this reader supports up to {max_supported})"
            ),
            FormatError::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum mismatch: footer says {expected:#010x}, computed {computed:#010x}"
            ),
            FormatError::BadFooterMagic => write!(f, "bad footer magic (truncated file?)"),
            FormatError::DelegateMismatch { expected, found } => write!(
                f,
                "delegate mismatch: expected {expected:?}, found {found:?}"
            ),
            FormatError::UnknownCodecTag(tag) => write!(f, "unknown codec tag {tag}"),
            FormatError::UnknownTokenWidth(w) => write!(f, "unknown token width parameter {w}"),
            FormatError::OffsetOutOfRange {
                field,
                offset,
                file_len,
            } => write!(
                f,
                "offset {offset} for {field} is outside file of length {file_len}"
            ),
            FormatError::TruncatedSection { section } => {
                write!(f, "truncated section: {section}")
            }
            FormatError::VarintTooLong => write!(f, "varint exceeds maximum encoded length"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Configuration errors: surfaced before query execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `sort_pos`/collation was requested under a sensitivity the terms
    /// service doesn't know (there are exactly two: sensitive, insensitive).
    UnknownSensitivity(String),
    /// A field name wasn't found in this segment or in the global terms
    /// service.
    UnknownField(String),
    /// A composite field name (`base%annotation@sensitivity#bookkeeping`)
    /// failed to parse (§6.4).
    InvalidFieldName(String),
    /// A rewrite was asked to satisfy a constraint no child can provide
    /// (e.g. sort order that contradicts a required uniqueness).
    ImpossibleRewrite(String),
    /// Two attributes on the same start tag collide at the same token
    /// position (§9 open question 3); the payload protocol can't
    /// distinguish them.
    AmbiguousTagAttribute { field: String, position: i64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownSensitivity(s) => write!(f, "unknown sensitivity: {s}"),
            ConfigError::UnknownField(s) => write!(f, "unknown field: {s}"),
            ConfigError::InvalidFieldName(s) => write!(f, "invalid composite field name: {s}"),
            ConfigError::ImpossibleRewrite(s) => write!(f, "impossible rewrite: {s}"),
            ConfigError::AmbiguousTagAttribute { field, position } => write!(
                f,
                "ambiguous tag attribute on field {field} at position {position}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Query errors: the tree as written can't be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// `noEmpty()` was requested of a node whose `matches_empty_sequence()`
    /// is the only thing it can ever produce.
    NoEmptyOnEmptyOnlyNode,
    /// A `Not` node was asked to complement an unbounded universe (no
    /// `max_doc`/doc length bound was available to complement against).
    UnboundedNegation,
    /// A capture slot index was referenced that no ancestor node declared.
    UnknownCaptureSlot(usize),
    /// A repetition's `min > max`.
    InvalidRepetitionRange { min: u32, max: u32 },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NoEmptyOnEmptyOnlyNode => {
                write!(f, "noEmpty() requested of a node that only matches the empty sequence")
            }
            QueryError::UnboundedNegation => {
                write!(f, "negation without a bounded universe to complement against")
            }
            QueryError::UnknownCaptureSlot(slot) => write!(f, "unknown capture slot {slot}"),
            QueryError::InvalidRepetitionRange { min, max } => {
                write!(f, "invalid repetition range {{{min},{max}}}: min > max")
            }
        }
    }
}

impl std::error::Error for QueryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_distinct_and_display() {
        let errs: Vec<Error> = vec![
            Error::Format(FormatError::BadFooterMagic),
            Error::Config(ConfigError::UnknownField("word".into())),
            Error::Query(QueryError::UnboundedNegation),
            Error::Io(io::Error::new(io::ErrorKind::Other, "disk gone")),
            Error::Cancelled,
        ];
        for e in &errs {
            // Every variant must produce a non-empty, distinct-looking message.
            assert!(!e.to_string().is_empty());
        }
    }

    #[test]
    fn cancelled_is_never_format_or_io() {
        let e = Error::Cancelled;
        assert!(!matches!(e, Error::Format(_) | Error::Io(_)));
    }
}
