// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end: write a segment, open it, run a span query across components
//! A-D, and confirm the NFA matcher (component E) agrees with the span
//! engine on the same literal-sequence pattern.

use blacklab_core::codec::reader::SegmentCodecReader;
use blacklab_core::codec::termorder::DefaultCollator;
use blacklab_core::codec::writer::SegmentCodecWriter;
use blacklab_core::fields::Sensitivity;
use blacklab_core::forward_index::ForwardIndex;
use blacklab_core::nfa::{Direction, Nfa, NfaExpr};
use blacklab_core::spans::{SegmentContext, SequenceNode, SpanNode, TermNode, NO_MORE_DOCS, NO_MORE_POSITIONS};
use blacklab_core::terms::{GlobalTermsBuilder, SegmentTermSource};
use blacklab_core::MockPostingsSource;

const FIELD: &str = "contents%word@s";

fn build_two_doc_segment() -> (ForwardIndex, MockPostingsSource) {
    let docs = vec![
        vec!["the".to_string(), "big".into(), "brown".into(), "fox".into()],
        vec!["a".to_string(), "big".into(), "cat".into()],
    ];
    let source = MockPostingsSource::from_primary_tokens(vec![(FIELD.to_string(), docs)]);
    let files = SegmentCodecWriter::new("_0", "test-delegate").write_segment(&source, |_| true);
    let reader = SegmentCodecReader::open(&files).unwrap();
    (ForwardIndex::new(reader), source)
}

fn run(mut node: Box<dyn SpanNode>, fi: &ForwardIndex, ps: &MockPostingsSource) -> Vec<(i32, i32, i32)> {
    node = node.rewrite();
    let view = fi.view();
    let ctx = SegmentContext { forward_index: &view, postings: ps };
    let mut spans = node.spans_for_segment(&ctx).unwrap();
    let mut out = Vec::new();
    loop {
        let doc = spans.next_doc().unwrap();
        if doc == NO_MORE_DOCS {
            break;
        }
        loop {
            let start = spans.next_start_position().unwrap();
            if start == NO_MORE_POSITIONS {
                break;
            }
            out.push((spans.doc_id(), spans.start(), spans.end()));
        }
    }
    out
}

#[test]
fn sequence_query_finds_big_brown_across_the_segment() {
    let (fi, ps) = build_two_doc_segment();
    let node: Box<dyn SpanNode> = Box::new(SequenceNode::new(vec![
        Box::new(TermNode::new(FIELD, "big")),
        Box::new(TermNode::new(FIELD, "brown")),
    ]));
    let hits = run(node, &fi, &ps);
    assert_eq!(hits, vec![(0, 1, 3)]);
}

#[test]
fn nfa_matcher_agrees_with_span_engine_on_the_same_pattern() {
    let (fi, _ps) = build_two_doc_segment();
    let view = fi.view();

    let expr = NfaExpr::Concat(vec![
        NfaExpr::Literal { field: FIELD.to_string(), term: b"big".to_vec(), sensitivity: Sensitivity::Sensitive },
        NfaExpr::Literal { field: FIELD.to_string(), term: b"brown".to_vec(), sensitivity: Sensitivity::Sensitive },
    ]);
    let nfa = Nfa::compile(&expr, Direction::Forward, &view, &DefaultCollator).unwrap();

    assert!(nfa.matches_at(&view, FIELD, 0, 1).unwrap());
    assert!(!nfa.matches_at(&view, FIELD, 0, 0).unwrap());
    assert!(!nfa.matches_at(&view, FIELD, 1, 0).unwrap());
}

#[test]
fn global_terms_union_covers_both_segments_vocabulary() {
    let (fi, _ps) = build_two_doc_segment();
    let reader = fi.view();
    let terms = reader.terms(FIELD).unwrap();

    let second_docs = vec![vec!["a".to_string(), "second".into(), "cat".into()]];
    let second_source = MockPostingsSource::from_primary_tokens(vec![(FIELD.to_string(), second_docs)]);
    let second_files = SegmentCodecWriter::new("_1", "test-delegate").write_segment(&second_source, |_| true);
    let second_reader = SegmentCodecReader::open(&second_files).unwrap();
    let second_terms = second_reader.terms(FIELD).unwrap();

    let sensitive_0: Vec<i32> =
        (0..terms.len() as i32).map(|id| reader.sort_pos(FIELD, id, Sensitivity::Sensitive).unwrap()).collect();
    let insensitive_0: Vec<i32> =
        (0..terms.len() as i32).map(|id| reader.sort_pos(FIELD, id, Sensitivity::Insensitive).unwrap()).collect();
    let sensitive_1: Vec<i32> = (0..second_terms.len() as i32)
        .map(|id| second_reader.sort_pos(FIELD, id, Sensitivity::Sensitive).unwrap())
        .collect();
    let insensitive_1: Vec<i32> = (0..second_terms.len() as i32)
        .map(|id| second_reader.sort_pos(FIELD, id, Sensitivity::Insensitive).unwrap())
        .collect();

    let sources = vec![
        SegmentTermSource {
            segment_id: 0,
            terms: &terms,
            sort_pos_sensitive: &sensitive_0,
            sort_pos_insensitive: &insensitive_0,
        },
        SegmentTermSource {
            segment_id: 1,
            terms: &second_terms,
            sort_pos_sensitive: &sensitive_1,
            sort_pos_insensitive: &insensitive_1,
        },
    ];

    let global = GlobalTermsBuilder::new(&DefaultCollator).build(&sources);
    assert_eq!(global.num_terms(), 7); // the,big,brown,fox,a,cat,second
}
