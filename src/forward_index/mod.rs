// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Component B: the forward-index reader (spec §4.2).
//!
//! Thin on top of [`crate::codec::reader::SegmentCodecReader`]: it adds
//! nothing the codec reader doesn't already do, because the codec reader's
//! `terms`/`doc_tokens`/`sort_pos` already implement the read surface §4.1
//! describes. What this module adds is the *per-thread view* discipline
//! (§4.2, §5): a [`ForwardIndex`] is `Clone` and cheap to clone (an `Arc`
//! bump), so each worker thread gets its own `ForwardIndexView` with no
//! shared mutable state, matching the teacher's thread-local scratch
//! pattern without actually needing a thread-local (§9 "shared mutable
//! scratch").

use std::sync::Arc;

use crate::codec::reader::SegmentCodecReader;
use crate::error::Result;
use crate::fields::Sensitivity;

/// One segment's forward index, shared read-only across threads.
#[derive(Clone)]
pub struct ForwardIndex {
    reader: Arc<SegmentCodecReader>,
}

impl ForwardIndex {
    pub fn new(reader: SegmentCodecReader) -> Self {
        Self { reader: Arc::new(reader) }
    }

    pub fn num_docs(&self) -> usize {
        self.reader.num_docs()
    }

    /// A cheap per-thread view. Two views of the same forward index never
    /// share mutable state; each call allocates its own output buffer.
    pub fn view(&self) -> ForwardIndexView {
        ForwardIndexView { reader: self.reader.clone() }
    }
}

/// A per-thread handle onto a [`ForwardIndex`]. Reading from two views
/// concurrently (on different segments, or the same segment from different
/// threads) never races: all state here is either `Arc`-shared and
/// immutable, or owned by the call (the `Vec<i32>` returned by
/// [`Self::doc_tokens`]).
pub struct ForwardIndexView {
    reader: Arc<SegmentCodecReader>,
}

impl ForwardIndexView {
    /// `doc_tokens(field, doc, start, end)`, clamped to `[0, doc_length)`
    /// (§4.2 steps 1-2).
    pub fn doc_tokens(&self, field: &str, doc: i32, start: usize, end: usize) -> Result<Vec<i32>> {
        self.reader.doc_tokens(field, doc, start, end)
    }

    pub fn doc_length(&self, field: &str, doc: i32) -> Result<usize> {
        self.reader.doc_length(field, doc)
    }

    pub fn terms(&self, field: &str) -> Result<Vec<Vec<u8>>> {
        self.reader.terms(field)
    }

    pub fn sort_pos(&self, field: &str, term_id: i32, sensitivity: Sensitivity) -> Result<i32> {
        self.reader.sort_pos(field, term_id, sensitivity)
    }

    pub fn segment_to_global(&self, field: &str, term_id: i32) -> i32 {
        self.reader.segment_to_global(field, term_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::SegmentCodecWriter;
    use crate::postings_source::MockPostingsSource;

    fn sample_index() -> ForwardIndex {
        let source = MockPostingsSource::from_primary_tokens(vec![(
            "contents%word@s".to_string(),
            vec![vec!["the".into(), "big".into(), "big".into(), "cat".into()]],
        )]);
        let files = SegmentCodecWriter::new("_0", "mock-delegate").write_segment(&source, |_| true);
        let reader = SegmentCodecReader::open(&files).unwrap();
        ForwardIndex::new(reader)
    }

    #[test]
    fn two_views_read_independently() {
        let index = sample_index();
        let v1 = index.view();
        let v2 = index.view();
        let field = "contents%word@s";
        assert_eq!(v1.doc_length(field, 0).unwrap(), 4);
        assert_eq!(v2.doc_tokens(field, 0, 0, 2).unwrap().len(), 2);
    }

    #[test]
    fn clamped_range_never_panics_past_doc_length() {
        let index = sample_index();
        let view = index.view();
        let field = "contents%word@s";
        // Requesting past doc_length is the caller's responsibility to
        // clamp per spec, but the reader clamps internally too.
        let tokens = view.doc_tokens(field, 0, 2, 100).unwrap();
        assert_eq!(tokens.len(), 2);
    }
}
