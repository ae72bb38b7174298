// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! A `Spans` implementation backed by a pre-sorted, in-memory hit list.
//!
//! Several composite nodes (AND, OR, Sequence, Repetition, Containment,
//! Sorted, Unique, Not) are simplest to implement by draining their
//! children fully and recombining, then handing the combined result back
//! out through the same lazy-cursor contract every other node uses. This
//! trades the fully streaming join the teacher's production code would use
//! for implementation clarity; §5's memory bound ("a sort/dedupe node is
//! the only construct that materializes all hits of a doc at once") is
//! honored by every node that streams straight from postings (`TermNode`,
//! `TagSpansNode`) — only the structural combinators here buffer.

use crate::error::Result;
use crate::spans::spans_iter::{Spans, NO_MORE_DOCS, NO_MORE_POSITIONS};

/// `(doc, start, end)` hits grouped into contiguous per-doc runs, sorted by
/// `(doc, start, end)` ascending — start-point-sorted order (§4.4).
pub struct MaterializedSpans {
    hits: Vec<(i32, i32, i32)>,
    /// `(doc_id, first_index, last_index_exclusive)`.
    groups: Vec<(i32, usize, usize)>,
    group_idx: Option<usize>,
    row_idx: Option<usize>,
}

impl MaterializedSpans {
    /// Build from an unsorted hit list, sorting and grouping it.
    pub fn new(mut hits: Vec<(i32, i32, i32)>) -> Self {
        hits.sort_unstable();
        let groups = group_by_doc(&hits);
        MaterializedSpans { hits, groups, group_idx: None, row_idx: None }
    }

    /// Drain any `Spans` into a flat hit vector (used by composite nodes to
    /// materialize their children before recombining).
    pub fn collect_all(spans: &mut dyn Spans) -> Result<Vec<(i32, i32, i32)>> {
        let mut out = Vec::new();
        loop {
            let doc = spans.next_doc()?;
            if doc == NO_MORE_DOCS {
                break;
            }
            loop {
                let start = spans.next_start_position()?;
                if start == NO_MORE_POSITIONS {
                    break;
                }
                out.push((spans.doc_id(), spans.start(), spans.end()));
            }
        }
        Ok(out)
    }
}

fn group_by_doc(hits: &[(i32, i32, i32)]) -> Vec<(i32, usize, usize)> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < hits.len() {
        let doc = hits[i].0;
        let start = i;
        while i < hits.len() && hits[i].0 == doc {
            i += 1;
        }
        groups.push((doc, start, i));
    }
    groups
}

impl Spans for MaterializedSpans {
    fn next_doc(&mut self) -> Result<i32> {
        let next = match self.group_idx {
            None => 0,
            Some(g) => g + 1,
        };
        if next >= self.groups.len() {
            self.group_idx = Some(self.groups.len());
            return Ok(NO_MORE_DOCS);
        }
        self.group_idx = Some(next);
        self.row_idx = None;
        Ok(self.groups[next].0)
    }

    fn next_start_position(&mut self) -> Result<i32> {
        let g = match self.group_idx {
            Some(g) if g < self.groups.len() => g,
            _ => return Ok(NO_MORE_POSITIONS),
        };
        let (_, first, last) = self.groups[g];
        let next_row = match self.row_idx {
            None => first,
            Some(r) => r + 1,
        };
        if next_row >= last {
            return Ok(NO_MORE_POSITIONS);
        }
        self.row_idx = Some(next_row);
        Ok(self.hits[next_row].1)
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        loop {
            let doc = self.next_doc()?;
            if doc == NO_MORE_DOCS || doc >= target {
                return Ok(doc);
            }
        }
    }

    fn advance_start_position(&mut self, target: i32) -> Result<i32> {
        loop {
            let start = self.next_start_position()?;
            if start == NO_MORE_POSITIONS || start >= target {
                return Ok(start);
            }
        }
    }

    fn doc_id(&self) -> i32 {
        self.group_idx.and_then(|g| self.groups.get(g)).map(|g| g.0).unwrap_or(NO_MORE_DOCS)
    }

    fn start(&self) -> i32 {
        self.row_idx.map(|r| self.hits[r].1).unwrap_or(NO_MORE_POSITIONS)
    }

    fn end(&self) -> i32 {
        self.row_idx.map(|r| self.hits[r].2).unwrap_or(NO_MORE_POSITIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_docs_and_positions_in_order() {
        let mut spans = MaterializedSpans::new(vec![(2, 0, 1), (1, 5, 6), (1, 0, 1)]);
        assert_eq!(spans.next_doc().unwrap(), 1);
        assert_eq!(spans.next_start_position().unwrap(), 0);
        assert_eq!(spans.end(), 1);
        assert_eq!(spans.next_start_position().unwrap(), 5);
        assert_eq!(spans.next_start_position().unwrap(), NO_MORE_POSITIONS);
        assert_eq!(spans.next_doc().unwrap(), 2);
        assert_eq!(spans.next_start_position().unwrap(), 0);
        assert_eq!(spans.next_doc().unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn advance_skips_to_first_doc_at_or_past_target() {
        let mut spans = MaterializedSpans::new(vec![(1, 0, 1), (3, 0, 1), (5, 0, 1)]);
        assert_eq!(spans.advance(3).unwrap(), 3);
        assert_eq!(spans.advance(4).unwrap(), 5);
        assert_eq!(spans.advance(10).unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn empty_hit_list_yields_no_more_docs_immediately() {
        let mut spans = MaterializedSpans::new(vec![]);
        assert_eq!(spans.next_doc().unwrap(), NO_MORE_DOCS);
    }
}
