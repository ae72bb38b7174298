// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Segment-sharded parallel search (spec §5, `parallel` feature).
//!
//! "The engine is cooperative and single-threaded per search operation;
//! parallelism is achieved by sharding a query across segments and running
//! one iterator tree per segment on a worker thread." One query tree
//! ([`SpanNode`]) is immutable and shared by reference; each worker drives
//! its own [`Spans`] cursor over its own segment with no shared mutable
//! state, matching §5's "Shared resources" / "Per-thread objects ... must
//! not be shared."

use rayon::prelude::*;

use crate::error::Result;
use crate::spans::materialized::MaterializedSpans;
use crate::spans::{SegmentContext, SpanNode};

/// Run `node` against every segment context in parallel, returning each
/// segment's hits in the same order as `contexts` (not merged: §5 "the
/// engine itself makes no cross-segment ordering promise" — callers merge
/// as their own ordering policy requires).
pub fn search_segments_parallel(
    node: &dyn SpanNode,
    contexts: &[SegmentContext<'_>],
) -> Result<Vec<Vec<(i32, i32, i32)>>> {
    contexts
        .par_iter()
        .map(|ctx| {
            let mut spans = node.spans_for_segment(ctx)?;
            MaterializedSpans::collect_all(spans.as_mut())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::reader::SegmentCodecReader;
    use crate::codec::writer::SegmentCodecWriter;
    use crate::forward_index::ForwardIndex;
    use crate::postings_source::MockPostingsSource;
    use crate::spans::TermNode;

    const FIELD: &str = "contents%word@s";

    fn segment(doc: Vec<&str>) -> (ForwardIndex, MockPostingsSource) {
        let docs = vec![doc.into_iter().map(String::from).collect()];
        let source = MockPostingsSource::from_primary_tokens(vec![(FIELD.to_string(), docs)]);
        let files = SegmentCodecWriter::new("_0", "mock-delegate").write_segment(&source, |_| true);
        let reader = SegmentCodecReader::open(&files).unwrap();
        (ForwardIndex::new(reader), source)
    }

    #[test]
    fn searches_every_segment_and_preserves_input_order() {
        let (fi_a, ps_a) = segment(vec!["the", "cat"]);
        let (fi_b, ps_b) = segment(vec!["the", "dog"]);
        let (fi_c, ps_c) = segment(vec!["a", "cat"]);

        let view_a = fi_a.view();
        let view_b = fi_b.view();
        let view_c = fi_c.view();
        let contexts = vec![
            SegmentContext { forward_index: &view_a, postings: &ps_a },
            SegmentContext { forward_index: &view_b, postings: &ps_b },
            SegmentContext { forward_index: &view_c, postings: &ps_c },
        ];

        let node = TermNode::new(FIELD, "the".as_bytes());
        let results = search_segments_parallel(&node, &contexts).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], vec![(0, 0, 1)]); // segment A has "the"
        assert_eq!(results[1], vec![(0, 0, 1)]); // segment B has "the"
        assert_eq!(results[2], Vec::<(i32, i32, i32)>::new()); // segment C doesn't
    }
}
