// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Component A: the segment codec (writer + reader), spec §4.1, §6.2.
//!
//! Every extension file begins with a [`header::CodecHeader`] and ends with
//! a CRC32 footer (`header::write_framed`/`read_framed`). Within that frame:
//!
//! - `.fields`  — [`FieldInfo`] records, one per annotated field.
//! - `.terms`   — concatenated length-prefixed term byte strings.
//! - `.termindex` — `n_terms` big-endian `i64` offsets into `.terms`.
//! - `.termorder` — four `n_terms` big-endian `i32` arrays per field
//!   ([`termorder::TermOrder`]).
//! - `.tokensindex` — `n_docs` fixed-stride records per field.
//! - `.tokens`  — packed per-doc token payloads.

pub mod encoding;
pub mod header;
pub mod reader;
pub mod staging;
pub mod termorder;
pub mod tokens;
pub mod writer;

use crate::error::FormatError;

/// One annotated field's directory entry in `.fields` (spec §4.1's table,
/// §6.2's `Field` struct).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub num_terms: i32,
    pub term_order_off: i64,
    pub term_index_off: i64,
    pub tokens_index_off: i64,
}

/// One document's entry in `.tokensindex`: `(offset, length, codec_tag,
/// codec_param)` (spec §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokensIndexEntry {
    pub offset: i64,
    pub length: i32,
    pub codec_tag: u8,
    pub codec_param: u8,
}

pub const TOKENS_INDEX_ENTRY_SIZE: usize = 8 + 4 + 1 + 1;

impl TokensIndexEntry {
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.offset.to_be_bytes());
        buf.extend_from_slice(&self.length.to_be_bytes());
        buf.push(self.codec_tag);
        buf.push(self.codec_param);
    }

    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < TOKENS_INDEX_ENTRY_SIZE {
            return Err(FormatError::TruncatedSection { section: "tokensindex entry" });
        }
        Ok(TokensIndexEntry {
            offset: i64::from_be_bytes(bytes[0..8].try_into().unwrap()),
            length: i32::from_be_bytes(bytes[8..12].try_into().unwrap()),
            codec_tag: bytes[12],
            codec_param: bytes[13],
        })
    }
}

/// The six in-memory byte buffers a [`writer::SegmentCodecWriter`] produces
/// and a [`reader::SegmentCodecReader`] consumes, one per extension file.
/// A host persists these under `<segment_id>.fields`, `<segment_id>.terms`,
/// etc.; the core itself is filesystem-agnostic (it only ever sees byte
/// slices), matching §1's "library loaded in-process."
#[derive(Debug, Clone, Default)]
pub struct SegmentFiles {
    pub fields: Vec<u8>,
    pub terms: Vec<u8>,
    pub termindex: Vec<u8>,
    pub termorder: Vec<u8>,
    pub tokensindex: Vec<u8>,
    pub tokens: Vec<u8>,
}

impl SegmentFiles {
    pub fn extension_bytes(&self, suffix: &str) -> Option<&[u8]> {
        match suffix {
            "fields" => Some(&self.fields),
            "terms" => Some(&self.terms),
            "termindex" => Some(&self.termindex),
            "termorder" => Some(&self.termorder),
            "tokensindex" => Some(&self.tokensindex),
            "tokens" => Some(&self.tokens),
            _ => None,
        }
    }
}
