// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! The inverted-index adapter (spec §6.3).
//!
//! The core does not implement a general inverted index. It consumes one
//! through this narrow interface so that a concrete host (Lucene, or
//! anything else with postings) can plug in without the core depending on
//! any particular inverted-index crate.
//!
//! # Payload protocol
//!
//! Within a position's payload, the first byte indicates whether this value
//! is the *primary* value for its position (bit `0x01`) and whether a
//! following varint encodes the *end position* for a tag span (bit `0x02`).
//! Writers must set the primary bit for exactly one value per token
//! position; readers must skip the indicator byte before interpreting the
//! rest. This is the only cross-layer coupling between the (out of scope)
//! DocIndexer and the core.

use crate::codec::encoding::{decode_varint, encode_varint};

/// Bit set on a payload's indicator byte when this value is the primary
/// value for its token position (the only one the forward index stores).
pub const PAYLOAD_PRIMARY: u8 = 0x01;
/// Bit set on a payload's indicator byte when a varint-encoded end position
/// follows, reconstructing a tag span (§4.4 TagSpans, §6.2).
pub const PAYLOAD_HAS_END_POSITION: u8 = 0x02;

/// One position's decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub is_primary: bool,
    pub end_position: Option<i64>,
}

impl Payload {
    /// Encode this payload's indicator byte and (optional) end-position
    /// varint.
    pub fn encode(self, buf: &mut Vec<u8>) {
        let mut indicator = 0u8;
        if self.is_primary {
            indicator |= PAYLOAD_PRIMARY;
        }
        if self.end_position.is_some() {
            indicator |= PAYLOAD_HAS_END_POSITION;
        }
        buf.push(indicator);
        if let Some(end) = self.end_position {
            encode_varint(end as u64, buf);
        }
    }

    /// Decode a payload from raw bytes (indicator byte first, as written by
    /// `encode`). Returns `(payload, bytes_consumed)`.
    pub fn decode(bytes: &[u8]) -> Option<(Payload, usize)> {
        let indicator = *bytes.first()?;
        let is_primary = indicator & PAYLOAD_PRIMARY != 0;
        if indicator & PAYLOAD_HAS_END_POSITION != 0 {
            let (end, consumed) = decode_varint(&bytes[1..]).ok()?;
            Some((Payload { is_primary, end_position: Some(end as i64) }, 1 + consumed))
        } else {
            Some((Payload { is_primary, end_position: None }, 1))
        }
    }
}

/// One occurrence of a term at a position within a document, with its
/// decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPosting {
    pub position: i64,
    pub payload: Payload,
}

/// One document's postings for one term: its frequency and the positions it
/// occurs at.
#[derive(Debug, Clone)]
pub struct DocPostings {
    pub doc_id: i32,
    pub positions: Vec<PositionPosting>,
}

/// One term's full postings list within a field.
#[derive(Debug, Clone)]
pub struct TermPostings {
    pub term: Vec<u8>,
    pub docs: Vec<DocPostings>,
}

/// The narrow adapter surface the segment codec writer consumes (§6.3).
///
/// A host inverted index implements this once; the core never needs to know
/// anything else about how postings are stored or iterated. `Send + Sync`
/// supertraits let `&dyn PostingsSource` be shared across worker threads by
/// the `parallel` feature's segment-sharded search (§5).
pub trait PostingsSource: Send + Sync {
    /// Fields present in this segment, in an implementation-defined but
    /// stable order (the writer iterates them once and records them in
    /// `.fields` in the order returned here).
    fn fields_in_segment(&self) -> Vec<String>;

    /// All terms of `field` with their postings, in term order (the order
    /// the writer assigns segment term ids in — I1: dense `0..N_seg`).
    fn terms_of(&self, field: &str) -> Vec<TermPostings>;

    /// Highest segment doc id plus one (the number of documents whose ids
    /// are potentially present in this segment).
    fn max_doc_in_segment(&self) -> i32;
}

/// An in-memory [`PostingsSource`], used by tests, the CLI's `build`
/// subcommand, and example/integration tests in place of a real Lucene-like
/// host. Construct with [`MockPostingsSource::from_primary_tokens`] for the
/// common case of "I already have, per field, per doc, a plain token
/// string array" and it derives term dictionaries/postings/payloads itself.
#[derive(Debug, Clone, Default)]
pub struct MockPostingsSource {
    fields: Vec<String>,
    // field -> term (bytes) -> postings
    postings: std::collections::HashMap<String, Vec<TermPostings>>,
    max_doc: i32,
}

impl MockPostingsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mock source from, per field, a `Vec` of per-document token
    /// strings (`docs[field][doc_id] = vec!["the", "cat", "sat"]`). Every
    /// token becomes a primary-value posting at its position; term ids are
    /// assigned in first-seen order per field.
    pub fn from_primary_tokens(docs: Vec<(String, Vec<Vec<String>>)>) -> Self {
        let mut source = MockPostingsSource::new();
        let mut max_doc = 0;
        for (field, per_doc_tokens) in docs {
            max_doc = max_doc.max(per_doc_tokens.len() as i32);
            let mut term_order: Vec<String> = Vec::new();
            let mut term_index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
            let mut per_term_docs: Vec<std::collections::BTreeMap<i32, Vec<PositionPosting>>> = Vec::new();

            for (doc_id, tokens) in per_doc_tokens.iter().enumerate() {
                for (pos, tok) in tokens.iter().enumerate() {
                    let term_idx = *term_index.entry(tok.clone()).or_insert_with(|| {
                        term_order.push(tok.clone());
                        per_term_docs.push(std::collections::BTreeMap::new());
                        term_order.len() - 1
                    });
                    per_term_docs[term_idx].entry(doc_id as i32).or_default().push(PositionPosting {
                        position: pos as i64,
                        payload: Payload { is_primary: true, end_position: None },
                    });
                }
            }

            let terms = term_order
                .into_iter()
                .enumerate()
                .map(|(idx, term)| TermPostings {
                    term: term.into_bytes(),
                    docs: per_term_docs[idx]
                        .iter()
                        .map(|(&doc_id, positions)| DocPostings { doc_id, positions: positions.clone() })
                        .collect(),
                })
                .collect();

            source.fields.push(field.clone());
            source.postings.insert(field, terms);
        }
        source.max_doc = max_doc;
        source
    }
}

impl PostingsSource for MockPostingsSource {
    fn fields_in_segment(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn terms_of(&self, field: &str) -> Vec<TermPostings> {
        self.postings.get(field).cloned().unwrap_or_default()
    }

    fn max_doc_in_segment(&self) -> i32 {
        self.max_doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_primary_only() {
        let p = Payload { is_primary: true, end_position: None };
        let mut buf = Vec::new();
        p.encode(&mut buf);
        let (decoded, consumed) = Payload::decode(&buf).unwrap();
        assert_eq!(decoded, p);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn payload_round_trips_with_end_position() {
        let p = Payload { is_primary: true, end_position: Some(42) };
        let mut buf = Vec::new();
        p.encode(&mut buf);
        let (decoded, consumed) = Payload::decode(&buf).unwrap();
        assert_eq!(decoded, p);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn mock_source_assigns_dense_first_seen_term_ids() {
        let source = MockPostingsSource::from_primary_tokens(vec![(
            "word".to_string(),
            vec![vec!["the".into(), "cat".into(), "the".into()]],
        )]);
        let terms = source.terms_of("word");
        assert_eq!(terms.len(), 2); // "the", "cat" -- first-seen order
        assert_eq!(terms[0].term, b"the");
        assert_eq!(terms[1].term, b"cat");
        assert_eq!(terms[0].docs[0].positions.len(), 2); // "the" at positions 0 and 2
    }
}
