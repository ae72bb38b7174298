// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! The segment codec reader: the read surface over a [`super::SegmentFiles`]
//! bundle (spec §4.1 "Read surface", §4.2).
//!
//! A reader is built once per segment view and is cheap to clone (it only
//! holds shared, immutable byte buffers plus a parsed directory), matching
//! the forward-index reader's "cheap per-thread clone" contract (§4.2).

use std::sync::Arc;

use crate::codec::encoding::{read_i32_array, read_i64_array, read_string};
use crate::codec::header::read_framed;
use crate::codec::tokens::{decode_range, CodecTag};
use crate::codec::{FieldInfo, SegmentFiles, TokensIndexEntry, TOKENS_INDEX_ENTRY_SIZE};
use crate::error::{Error, FormatError};
use crate::fields::Sensitivity;

/// Parsed `.fields` directory plus the raw bodies of the other extension
/// files, ready for random access. Construction validates every extension's
/// header/footer once; after that, all accessors are infallible-looking
/// slices guarded by bounds checks that return [`FormatError`] instead of
/// panicking on a corrupt segment.
#[derive(Clone)]
pub struct SegmentCodecReader {
    delegate_name: String,
    n_docs: usize,
    fields: Vec<FieldInfo>,
    terms: Arc<[u8]>,
    termindex: Arc<[u8]>,
    termorder: Arc<[u8]>,
    tokensindex: Arc<[u8]>,
    tokens: Arc<[u8]>,
}

impl SegmentCodecReader {
    /// Open a reader over a full set of segment files, validating headers,
    /// footers, and cross-file delegate-name agreement (§6.2: "a reader
    /// must reject a segment whose delegate name does not match its own").
    pub fn open(files: &SegmentFiles) -> Result<Self, Error> {
        let (fields_header, fields_body) = read_framed(&files.fields)?;
        let (terms_header, terms_body) = read_framed(&files.terms)?;
        let (termindex_header, termindex_body) = read_framed(&files.termindex)?;
        let (termorder_header, termorder_body) = read_framed(&files.termorder)?;
        let (tokensindex_header, tokensindex_body) = read_framed(&files.tokensindex)?;
        let (tokens_header, tokens_body) = read_framed(&files.tokens)?;

        let delegate_name = fields_header.delegate_name.clone();
        for header in [&terms_header, &termindex_header, &termorder_header, &tokensindex_header, &tokens_header] {
            if header.delegate_name != delegate_name {
                return Err(FormatError::DelegateMismatch {
                    expected: delegate_name,
                    found: header.delegate_name.clone(),
                }
                .into());
            }
            if header.segment_id != fields_header.segment_id {
                return Err(FormatError::DelegateMismatch {
                    expected: fields_header.segment_id.clone(),
                    found: header.segment_id.clone(),
                }
                .into());
            }
        }

        let mut pos = 0;
        let n_docs_arr = read_i32_array(&fields_body[pos..], 1)?;
        let n_docs = n_docs_arr[0].max(0) as usize;
        pos += 4;

        let n_fields = read_i32_array(&fields_body[pos..], 1)?[0] as usize;
        pos += 4;

        let mut fields = Vec::with_capacity(n_fields);
        for _ in 0..n_fields {
            let (name, consumed) = read_string(&fields_body[pos..])?;
            pos += consumed;
            let num_terms = read_i32_array(&fields_body[pos..], 1)?[0];
            pos += 4;
            let offs = read_i64_array(&fields_body[pos..], 3)?;
            pos += 24;
            fields.push(FieldInfo {
                name,
                num_terms,
                term_order_off: offs[0],
                term_index_off: offs[1],
                tokens_index_off: offs[2],
            });
        }

        Ok(SegmentCodecReader {
            delegate_name,
            n_docs,
            fields,
            terms: Arc::from(terms_body),
            termindex: Arc::from(termindex_body),
            termorder: Arc::from(termorder_body),
            tokensindex: Arc::from(tokensindex_body),
            tokens: Arc::from(tokens_body),
        })
    }

    pub fn delegate_name(&self) -> &str {
        &self.delegate_name
    }

    pub fn num_docs(&self) -> usize {
        self.n_docs
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    fn field_info(&self, field: &str) -> Result<&FieldInfo, Error> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .ok_or_else(|| crate::error::ConfigError::UnknownField(field.to_string()).into())
    }

    /// All term byte strings of `field`, in term-id order.
    pub fn terms(&self, field: &str) -> Result<Vec<Vec<u8>>, Error> {
        let info = self.field_info(field)?;
        let n = info.num_terms as usize;
        let offsets = read_i64_array(&self.termindex[info.term_index_off as usize..], n)?;
        let mut out = Vec::with_capacity(n);
        for &offset in &offsets {
            let (s, _) = read_string(&self.terms[offset as usize..])?;
            out.push(s.into_bytes());
        }
        Ok(out)
    }

    /// The sort position of `term_id` in `field` under `sensitivity`.
    pub fn sort_pos(&self, field: &str, term_id: i32, sensitivity: Sensitivity) -> Result<i32, Error> {
        let info = self.field_info(field)?;
        let n = info.num_terms as usize;
        if term_id < 0 || term_id as usize >= n {
            return Err(crate::error::ConfigError::UnknownField(format!("{field}[{term_id}]")).into());
        }
        let base = info.term_order_off as usize;
        // Layout written by the writer: insens_pos->term, insens term->pos,
        // sens term->pos, sens pos->term -- wait, match writer.rs's actual
        // order: term_id_to_insensitive_pos, insensitive_pos_to_term_id,
        // term_id_to_sensitive_pos, sensitive_pos_to_term_id.
        let term_id_to_insensitive_pos = base;
        let insensitive_pos_to_term_id = term_id_to_insensitive_pos + n * 4;
        let term_id_to_sensitive_pos = insensitive_pos_to_term_id + n * 4;
        let _sensitive_pos_to_term_id = term_id_to_sensitive_pos + n * 4;

        let offset = match sensitivity {
            Sensitivity::Insensitive => term_id_to_insensitive_pos,
            Sensitivity::Sensitive => term_id_to_sensitive_pos,
        };
        let arr = read_i32_array(&self.termorder[offset + (term_id as usize) * 4..], 1)?;
        Ok(arr[0])
    }

    /// The term id at sort position `pos` in `field` under `sensitivity`
    /// (the inverse of [`Self::sort_pos`]).
    pub fn term_at_sort_pos(&self, field: &str, pos: i32, sensitivity: Sensitivity) -> Result<i32, Error> {
        let info = self.field_info(field)?;
        let n = info.num_terms as usize;
        let base = info.term_order_off as usize;
        let insensitive_pos_to_term_id = base + n * 4;
        let sensitive_pos_to_term_id = insensitive_pos_to_term_id + n * 4 + n * 4;

        let offset = match sensitivity {
            Sensitivity::Insensitive => insensitive_pos_to_term_id,
            Sensitivity::Sensitive => sensitive_pos_to_term_id,
        };
        let arr = read_i32_array(&self.termorder[offset + (pos as usize) * 4..], 1)?;
        Ok(arr[0])
    }

    fn tokens_index_entry(&self, info: &FieldInfo, doc: i32) -> Result<TokensIndexEntry, Error> {
        if doc < 0 || doc as usize >= self.n_docs {
            return Err(crate::error::ConfigError::UnknownField(format!("doc {doc} out of range")).into());
        }
        let start = info.tokens_index_off as usize + (doc as usize) * TOKENS_INDEX_ENTRY_SIZE;
        let end = start + TOKENS_INDEX_ENTRY_SIZE;
        let bytes = self
            .tokensindex
            .get(start..end)
            .ok_or(FormatError::TruncatedSection { section: "tokensindex" })?;
        Ok(TokensIndexEntry::read(bytes)?)
    }

    /// Decode `[start, end)` of `doc`'s token stream in `field`, clamped to
    /// `[0, doc_length)` (§4.2).
    pub fn doc_tokens(&self, field: &str, doc: i32, start: usize, end: usize) -> Result<Vec<i32>, Error> {
        let info = self.field_info(field)?;
        let entry = self.tokens_index_entry(info, doc)?;
        let length = entry.length.max(0) as usize;
        let start = start.min(length);
        let end = end.min(length).max(start);
        let tag = CodecTag::from_u8(entry.codec_tag)?;
        let payload = self
            .tokens
            .get(entry.offset as usize..)
            .ok_or(FormatError::TruncatedSection { section: "tokens" })?;
        let decoded = decode_range(payload, tag, entry.codec_param, length, start, end)?;
        Ok(decoded)
    }

    /// `doc`'s full token-stream length in `field`.
    pub fn doc_length(&self, field: &str, doc: i32) -> Result<usize, Error> {
        let info = self.field_info(field)?;
        let entry = self.tokens_index_entry(info, doc)?;
        Ok(entry.length.max(0) as usize)
    }

    /// Maps a segment-local term id to the global term space. A bare segment
    /// reader has no global terms service wired in, so this returns the
    /// segment-local id unchanged; [`crate::terms::GlobalTerms`] overrides
    /// this mapping once segments are merged into one corpus-wide space.
    pub fn segment_to_global(&self, _field: &str, term_id: i32) -> i32 {
        term_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::SegmentCodecWriter;
    use crate::postings_source::MockPostingsSource;

    fn sample_reader() -> SegmentCodecReader {
        let source = MockPostingsSource::from_primary_tokens(vec![(
            "contents%word@s".to_string(),
            vec![
                vec!["the".into(), "big".into(), "big".into(), "cat".into()],
                vec!["the".into(), "dog".into()],
            ],
        )]);
        let files = SegmentCodecWriter::new("_0", "mock-delegate").write_segment(&source, |_| true);
        SegmentCodecReader::open(&files).unwrap()
    }

    #[test]
    fn opens_and_reports_doc_count() {
        let reader = sample_reader();
        assert_eq!(reader.num_docs(), 2);
        assert_eq!(reader.delegate_name(), "mock-delegate");
    }

    #[test]
    fn terms_round_trip_in_term_id_order() {
        let reader = sample_reader();
        let terms = reader.terms("contents%word@s").unwrap();
        assert_eq!(terms[0], b"the");
        assert_eq!(terms[1], b"big");
        assert_eq!(terms[2], b"cat");
        assert_eq!(terms[3], b"dog");
    }

    #[test]
    fn doc_tokens_reconstructs_original_sequence() {
        let reader = sample_reader();
        let field = "contents%word@s";
        let terms = reader.terms(field).unwrap();
        let doc0 = reader.doc_tokens(field, 0, 0, reader.doc_length(field, 0).unwrap()).unwrap();
        let words: Vec<&[u8]> = doc0.iter().map(|&id| terms[id as usize].as_slice()).collect();
        assert_eq!(words, vec![b"the".as_slice(), b"big", b"big", b"cat"]);

        let doc1 = reader.doc_tokens(field, 1, 0, reader.doc_length(field, 1).unwrap()).unwrap();
        let words1: Vec<&[u8]> = doc1.iter().map(|&id| terms[id as usize].as_slice()).collect();
        assert_eq!(words1, vec![b"the".as_slice(), b"dog"]);
    }

    #[test]
    fn partial_range_matches_full_slice() {
        let reader = sample_reader();
        let field = "contents%word@s";
        let full = reader.doc_tokens(field, 0, 0, 4).unwrap();
        let partial = reader.doc_tokens(field, 0, 1, 3).unwrap();
        assert_eq!(partial, full[1..3]);
    }

    #[test]
    fn sort_pos_and_term_at_sort_pos_are_inverses() {
        let reader = sample_reader();
        let field = "contents%word@s";
        let n = reader.field_info(field).unwrap().num_terms;
        for term_id in 0..n {
            let pos = reader.sort_pos(field, term_id, Sensitivity::Sensitive).unwrap();
            let back = reader.term_at_sort_pos(field, pos, Sensitivity::Sensitive).unwrap();
            assert_eq!(back, term_id);

            let pos_i = reader.sort_pos(field, term_id, Sensitivity::Insensitive).unwrap();
            let back_i = reader.term_at_sort_pos(field, pos_i, Sensitivity::Insensitive).unwrap();
            assert_eq!(back_i, term_id);
        }
    }

    #[test]
    fn unknown_field_is_a_config_error() {
        let reader = sample_reader();
        assert!(matches!(reader.terms("nope"), Err(Error::Config(_))));
    }
}
