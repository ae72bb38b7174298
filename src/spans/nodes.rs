// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! The node catalogue (spec §4.4): Term, AND, OR, Sequence, Repetition,
//! Containment, TagSpans, Filter-by-docset, Sorted, Unique, Not.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, QueryError, Result};
use crate::spans::captures::CaptureSlots;
use crate::spans::materialized::MaterializedSpans;
use crate::spans::rewrite::rewrite_and_flatten;
use crate::spans::{NodeKind, NodeProperties, SegmentContext, SpanNode, Spans};

fn collect(node: &dyn SpanNode, ctx: &SegmentContext<'_>) -> Result<Vec<(i32, i32, i32)>> {
    let mut spans = node.spans_for_segment(ctx)?;
    MaterializedSpans::collect_all(spans.as_mut())
}

// ---------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------

/// Attaches a named-capture slot index to a child (§4.4 "Capture groups").
/// Transparent for everything but `get_captured_groups`: this node's own
/// hits are exactly the child's hits. Capture propagation through composite
/// ancestors (AND, OR, Sequence, ...) is by delegation per spec, but those
/// nodes materialize their children via [`collect`] to recombine hits and
/// so cannot carry a per-hit capture association across that boundary
/// today; capture nodes compose cleanly only directly above a leaf or
/// directly below the query root.
#[derive(Debug)]
pub struct CaptureNode {
    pub child: Box<dyn SpanNode>,
    pub slot: usize,
}

impl CaptureNode {
    pub fn new(child: Box<dyn SpanNode>, slot: usize) -> Self {
        Self { child, slot }
    }
}

impl SpanNode for CaptureNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        Box::new(CaptureNode { child: self.child.rewrite(), slot: self.slot })
    }

    fn properties(&self) -> NodeProperties {
        self.child.properties()
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.child.reverse_matching_cost(ctx)
    }

    fn can_make_nfa(&self) -> bool {
        self.child.can_make_nfa()
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        Ok(Box::new(CaptureSpans { inner: self.child.spans_for_segment(ctx)?, slot: self.slot }))
    }
}

/// A `Spans` wrapper that records the current hit into `slot` on top of
/// whatever captures the wrapped child already sets.
struct CaptureSpans {
    inner: Box<dyn Spans>,
    slot: usize,
}

impl Spans for CaptureSpans {
    fn next_doc(&mut self) -> Result<i32> {
        self.inner.next_doc()
    }

    fn next_start_position(&mut self) -> Result<i32> {
        self.inner.next_start_position()
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        self.inner.advance(target)
    }

    fn advance_start_position(&mut self, target: i32) -> Result<i32> {
        self.inner.advance_start_position(target)
    }

    fn doc_id(&self) -> i32 {
        self.inner.doc_id()
    }

    fn start(&self) -> i32 {
        self.inner.start()
    }

    fn end(&self) -> i32 {
        self.inner.end()
    }

    fn get_captured_groups(&self, buf: &mut CaptureSlots) {
        self.inner.get_captured_groups(buf);
        buf.set(self.slot, self.inner.start(), self.inner.end());
    }
}

// ---------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------

/// Postings of a single `(field, term)` (§4.4): length-1 hits, already
/// start-point-sorted and unique because postings are strictly ordered.
#[derive(Debug, Clone)]
pub struct TermNode {
    pub field: String,
    pub term: Vec<u8>,
}

impl TermNode {
    pub fn new(field: impl Into<String>, term: impl Into<Vec<u8>>) -> Self {
        Self { field: field.into(), term: term.into() }
    }
}

impl SpanNode for TermNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        self
    }

    fn properties(&self) -> NodeProperties {
        NodeProperties::term()
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        ctx.postings
            .terms_of(&self.field)
            .iter()
            .find(|t| t.term == self.term)
            .map(|t| t.docs.iter().map(|d| d.positions.len() as u64).sum())
            .unwrap_or(0)
    }

    fn can_make_nfa(&self) -> bool {
        true
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let hits = ctx
            .postings
            .terms_of(&self.field)
            .into_iter()
            .find(|t| t.term == self.term)
            .map(|t| {
                t.docs
                    .iter()
                    .flat_map(|d| {
                        d.positions
                            .iter()
                            .filter(|p| p.payload.is_primary)
                            .map(move |p| (d.doc_id, p.position as i32, p.position as i32 + 1))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(Box::new(MaterializedSpans::new(hits)))
    }
}

// ---------------------------------------------------------------------
// AND
// ---------------------------------------------------------------------

/// Conjunction of exact spans: hits that appear in every child with
/// identical `(doc, start, end)` (§4.4).
#[derive(Debug)]
pub struct AndNode {
    pub children: Vec<Box<dyn SpanNode>>,
}

impl AndNode {
    pub fn new(children: Vec<Box<dyn SpanNode>>) -> Self {
        Self { children }
    }
}

impl SpanNode for AndNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        let flat = rewrite_and_flatten(self.children, NodeKind::And);
        if flat.len() == 1 {
            flat.into_iter().next().unwrap()
        } else {
            Box::new(AndNode::new(flat))
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::And
    }

    fn into_children(self: Box<Self>) -> Vec<Box<dyn SpanNode>> {
        self.children
    }

    fn properties(&self) -> NodeProperties {
        let all_sorted = self.children.iter().all(|c| c.properties().hits_start_point_sorted);
        let all_unique = self.children.iter().all(|c| c.properties().hits_are_unique);
        NodeProperties {
            matches_empty_sequence: self.children.iter().all(|c| c.properties().matches_empty_sequence),
            hits_all_same_length: false,
            hits_length_min: self.children.iter().map(|c| c.properties().hits_length_min).max().unwrap_or(0),
            hits_length_max: self.children.iter().filter_map(|c| c.properties().hits_length_max).min(),
            hits_start_point_sorted: all_sorted, // T5
            hits_end_point_sorted: false,
            hits_have_unique_start: all_unique,
            hits_have_unique_end: all_unique,
            hits_are_unique: all_unique,
        }
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.children.iter().map(|c| c.reverse_matching_cost(ctx)).min().unwrap_or(0)
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        if self.children.is_empty() {
            return Ok(Box::new(MaterializedSpans::new(Vec::new())));
        }
        let mut sets: Vec<HashSet<(i32, i32, i32)>> =
            self.children.iter().map(|c| Ok(collect(c.as_ref(), ctx)?.into_iter().collect())).collect::<Result<_>>()?;
        let mut result: HashSet<(i32, i32, i32)> = sets.pop().unwrap();
        for set in &sets {
            result.retain(|hit| set.contains(hit));
        }
        Ok(Box::new(MaterializedSpans::new(result.into_iter().collect())))
    }
}

// ---------------------------------------------------------------------
// OR
// ---------------------------------------------------------------------

/// Disjunction, k-way merged by `(doc, start, end)` (§4.4).
#[derive(Debug)]
pub struct OrNode {
    pub children: Vec<Box<dyn SpanNode>>,
}

impl OrNode {
    pub fn new(children: Vec<Box<dyn SpanNode>>) -> Self {
        Self { children }
    }
}

impl SpanNode for OrNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        let flat = rewrite_and_flatten(self.children, NodeKind::Or);
        if flat.len() == 1 {
            flat.into_iter().next().unwrap()
        } else {
            Box::new(OrNode::new(flat))
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Or
    }

    fn into_children(self: Box<Self>) -> Vec<Box<dyn SpanNode>> {
        self.children
    }

    fn properties(&self) -> NodeProperties {
        let all_sorted = self.children.iter().all(|c| c.properties().hits_start_point_sorted);
        NodeProperties {
            matches_empty_sequence: self.children.iter().any(|c| c.properties().matches_empty_sequence),
            hits_all_same_length: false,
            hits_length_min: self.children.iter().map(|c| c.properties().hits_length_min).min().unwrap_or(0),
            hits_length_max: self.children.iter().map(|c| c.properties().hits_length_max).max().flatten(),
            hits_start_point_sorted: all_sorted,
            hits_end_point_sorted: false,
            hits_have_unique_start: false,
            hits_have_unique_end: false,
            hits_are_unique: false,
        }
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.children.iter().map(|c| c.reverse_matching_cost(ctx)).sum()
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let mut all = Vec::new();
        for child in &self.children {
            all.extend(collect(child.as_ref(), ctx)?);
        }
        all.sort_unstable();
        all.dedup();
        Ok(Box::new(MaterializedSpans::new(all)))
    }
}

// ---------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------

/// Concatenation `A . B`: `(a.doc, a.start, b.end)` for every `a`, `b` with
/// `b.doc == a.doc` and `b.start == a.end` (T4).
#[derive(Debug)]
pub struct SequenceNode {
    pub children: Vec<Box<dyn SpanNode>>,
}

impl SequenceNode {
    pub fn new(children: Vec<Box<dyn SpanNode>>) -> Self {
        Self { children }
    }
}

impl SpanNode for SequenceNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        let flat = rewrite_and_flatten(self.children, NodeKind::Sequence);
        if flat.len() == 1 {
            flat.into_iter().next().unwrap()
        } else {
            Box::new(SequenceNode::new(flat))
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Sequence
    }

    fn into_children(self: Box<Self>) -> Vec<Box<dyn SpanNode>> {
        self.children
    }

    fn properties(&self) -> NodeProperties {
        NodeProperties {
            matches_empty_sequence: self.children.iter().all(|c| c.properties().matches_empty_sequence),
            hits_all_same_length: false,
            hits_length_min: self.children.iter().map(|c| c.properties().hits_length_min).sum(),
            hits_length_max: self.children.iter().try_fold(0u32, |acc, c| Some(acc + c.properties().hits_length_max?)),
            hits_start_point_sorted: false,
            hits_end_point_sorted: false,
            hits_have_unique_start: false,
            hits_have_unique_end: false,
            hits_are_unique: false,
        }
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.children.iter().map(|c| c.reverse_matching_cost(ctx)).min().unwrap_or(0)
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        if self.children.is_empty() {
            return Ok(Box::new(MaterializedSpans::new(Vec::new())));
        }
        let mut current = collect(self.children[0].as_ref(), ctx)?;
        for child in &self.children[1..] {
            let next_hits = collect(child.as_ref(), ctx)?;
            // Index the next clause's hits by (doc, start) so each
            // continuation lookup is O(1) amortized.
            let mut by_doc_start: HashMap<(i32, i32), Vec<i32>> = HashMap::new();
            for (doc, start, end) in &next_hits {
                by_doc_start.entry((*doc, *start)).or_default().push(*end);
            }
            let mut joined = Vec::new();
            for (doc, start, end) in current {
                if let Some(ends) = by_doc_start.get(&(doc, end)) {
                    for &new_end in ends {
                        joined.push((doc, start, new_end));
                    }
                }
            }
            current = joined;
        }
        Ok(Box::new(MaterializedSpans::new(current)))
    }
}

// ---------------------------------------------------------------------
// Repetition
// ---------------------------------------------------------------------

/// `A{min,max}` (§4.4): when bounded, computed as a chain of `Sequence`
/// joins of the base child with itself; lengths outside `[min, max]` are
/// dropped. `min == 0` additionally includes a zero-width hit at every
/// start position the base child occurs at (an approximation of "matches
/// empty sequence everywhere" documented in DESIGN.md).
#[derive(Debug)]
pub struct RepetitionNode {
    pub child: Box<dyn SpanNode>,
    pub min: u32,
    pub max: u32,
}

impl RepetitionNode {
    pub fn new(child: Box<dyn SpanNode>, min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(Error::Query(QueryError::InvalidRepetitionRange { min, max }));
        }
        Ok(Self { child, min, max })
    }
}

impl SpanNode for RepetitionNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        Box::new(RepetitionNode { child: self.child.rewrite(), min: self.min, max: self.max })
    }

    fn properties(&self) -> NodeProperties {
        let child_props = self.child.properties();
        NodeProperties {
            matches_empty_sequence: self.min == 0,
            hits_all_same_length: self.min == self.max && child_props.hits_all_same_length,
            hits_length_min: child_props.hits_length_min.saturating_mul(self.min),
            hits_length_max: child_props.hits_length_max.map(|m| m.saturating_mul(self.max)),
            hits_start_point_sorted: false,
            hits_end_point_sorted: false,
            hits_have_unique_start: false,
            hits_have_unique_end: false,
            hits_are_unique: false,
        }
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.child.reverse_matching_cost(ctx) * (self.max.max(1) as u64)
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let base = collect(self.child.as_ref(), ctx)?;
        let mut by_doc_start: HashMap<(i32, i32), Vec<i32>> = HashMap::new();
        for &(doc, start, end) in &base {
            by_doc_start.entry((doc, start)).or_default().push(end);
        }

        let mut result: HashSet<(i32, i32, i32)> = HashSet::new();
        // level[k] holds every hit reachable by chaining the base child k
        // times: (doc, start_of_chain, end_of_chain).
        let mut level: Vec<(i32, i32, i32)> = base.clone();
        if self.min <= 1 && self.max >= 1 {
            result.extend(level.iter().copied());
        }
        for k in 2..=self.max {
            let mut next_level = Vec::new();
            for &(doc, start, end) in &level {
                if let Some(ends) = by_doc_start.get(&(doc, end)) {
                    for &new_end in ends {
                        next_level.push((doc, start, new_end));
                    }
                }
            }
            if next_level.is_empty() {
                break;
            }
            if k >= self.min {
                result.extend(next_level.iter().copied());
            }
            level = next_level;
        }

        if self.min == 0 {
            for &(doc, start, _end) in &base {
                result.insert((doc, start, start));
            }
        }

        Ok(Box::new(MaterializedSpans::new(result.into_iter().collect())))
    }
}

// ---------------------------------------------------------------------
// Containment
// ---------------------------------------------------------------------

/// `A containing/within/starting-at/ending-at B` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentKind {
    Containing,
    Within,
    StartingAt,
    EndingAt,
}

#[derive(Debug)]
pub struct ContainmentNode {
    pub a: Box<dyn SpanNode>,
    pub b: Box<dyn SpanNode>,
    pub kind: ContainmentKind,
}

impl ContainmentNode {
    pub fn new(a: Box<dyn SpanNode>, b: Box<dyn SpanNode>, kind: ContainmentKind) -> Self {
        Self { a, b, kind }
    }
}

impl SpanNode for ContainmentNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        Box::new(ContainmentNode { a: self.a.rewrite(), b: self.b.rewrite(), kind: self.kind })
    }

    fn properties(&self) -> NodeProperties {
        self.a.properties()
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.a.reverse_matching_cost(ctx).min(self.b.reverse_matching_cost(ctx))
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let a_hits = collect(self.a.as_ref(), ctx)?;
        let b_hits = collect(self.b.as_ref(), ctx)?;
        let mut b_by_doc: HashMap<i32, Vec<(i32, i32)>> = HashMap::new();
        for (doc, start, end) in b_hits {
            b_by_doc.entry(doc).or_default().push((start, end));
        }

        let kind = self.kind;
        let keep = |doc: i32, start: i32, end: i32| -> bool {
            let Some(others) = b_by_doc.get(&doc) else { return false };
            others.iter().any(|&(bs, be)| match kind {
                ContainmentKind::Containing => bs >= start && be <= end,
                ContainmentKind::Within => start >= bs && end <= be,
                ContainmentKind::StartingAt => bs == start,
                ContainmentKind::EndingAt => be == end,
            })
        };

        let result: Vec<_> = a_hits.into_iter().filter(|&(doc, start, end)| keep(doc, start, end)).collect();
        Ok(Box::new(MaterializedSpans::new(result)))
    }
}

// ---------------------------------------------------------------------
// TagSpans
// ---------------------------------------------------------------------

/// Reconstructs `(start, end)` from a tag-start term whose payload carries
/// the end position (§4.4, §6.3). Empty tags (`end == start`) are valid
/// hits, not skipped (S6).
#[derive(Debug)]
pub struct TagSpansNode {
    pub field: String,
    pub tag_term: Vec<u8>,
}

impl TagSpansNode {
    pub fn new(field: impl Into<String>, tag_term: impl Into<Vec<u8>>) -> Self {
        Self { field: field.into(), tag_term: tag_term.into() }
    }
}

impl SpanNode for TagSpansNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        self
    }

    fn properties(&self) -> NodeProperties {
        NodeProperties { matches_empty_sequence: true, ..NodeProperties::term() }
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        TermNode::new(self.field.clone(), self.tag_term.clone()).reverse_matching_cost(ctx)
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let hits = ctx
            .postings
            .terms_of(&self.field)
            .into_iter()
            .find(|t| t.term == self.tag_term)
            .map(|t| {
                t.docs
                    .iter()
                    .flat_map(|d| {
                        d.positions.iter().filter_map(move |p| {
                            let end = p.payload.end_position.unwrap_or(p.position) as i32;
                            Some((d.doc_id, p.position as i32, end))
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(Box::new(MaterializedSpans::new(hits)))
    }
}

// ---------------------------------------------------------------------
// Filter-by-docset
// ---------------------------------------------------------------------

/// Intersects a child's hits with an explicit doc id set (§4.4).
#[derive(Debug)]
pub struct FilterByDocSetNode {
    pub child: Box<dyn SpanNode>,
    pub doc_ids: Vec<i32>,
}

impl FilterByDocSetNode {
    pub fn new(child: Box<dyn SpanNode>, doc_ids: Vec<i32>) -> Self {
        Self { child, doc_ids }
    }
}

impl SpanNode for FilterByDocSetNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        Box::new(FilterByDocSetNode { child: self.child.rewrite(), doc_ids: self.doc_ids })
    }

    fn properties(&self) -> NodeProperties {
        self.child.properties()
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.child.reverse_matching_cost(ctx)
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let allowed: HashSet<i32> = self.doc_ids.iter().copied().collect();
        let hits = collect(self.child.as_ref(), ctx)?.into_iter().filter(|h| allowed.contains(&h.0)).collect();
        Ok(Box::new(MaterializedSpans::new(hits)))
    }
}

// ---------------------------------------------------------------------
// Sorted
// ---------------------------------------------------------------------

/// Buffers hits per doc, sorts by start-point or end-point, optionally
/// deduping (§4.4). Only realized by the rewriter when the child does not
/// already satisfy the required order/uniqueness (rule 5).
#[derive(Debug)]
pub struct SortedNode {
    pub child: Box<dyn SpanNode>,
    pub by_end_point: bool,
    pub dedupe: bool,
}

impl SortedNode {
    pub fn new(child: Box<dyn SpanNode>, by_end_point: bool, dedupe: bool) -> Self {
        Self { child, by_end_point, dedupe }
    }
}

impl SpanNode for SortedNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        let props = self.child.properties();
        let already_sorted = if self.by_end_point { props.hits_end_point_sorted } else { props.hits_start_point_sorted };
        if already_sorted && (!self.dedupe || props.hits_are_unique) {
            return self.child.rewrite();
        }
        Box::new(SortedNode { child: self.child.rewrite(), by_end_point: self.by_end_point, dedupe: self.dedupe })
    }

    fn properties(&self) -> NodeProperties {
        let mut props = self.child.properties();
        if self.by_end_point {
            props.hits_end_point_sorted = true;
        } else {
            props.hits_start_point_sorted = true;
        }
        if self.dedupe {
            props.hits_are_unique = true;
        }
        props
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.child.reverse_matching_cost(ctx)
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let mut hits = collect(self.child.as_ref(), ctx)?;
        if self.by_end_point {
            hits.sort_unstable_by_key(|&(doc, start, end)| (doc, end, start));
        } else {
            hits.sort_unstable_by_key(|&(doc, start, end)| (doc, start, end));
        }
        if self.dedupe {
            hits.dedup();
        }
        // MaterializedSpans always sorts by (doc, start, end); when sorting
        // by end-point we bypass that default ordering by pre-sorting and
        // relying on MaterializedSpans's own re-sort only when it agrees
        // (start-point order). For end-point order, build groups directly.
        if self.by_end_point {
            Ok(Box::new(EndPointSortedSpans::new(hits)))
        } else {
            Ok(Box::new(MaterializedSpans::new(hits)))
        }
    }
}

/// A `Spans` over hits already sorted by `(doc, end, start)`, used by
/// `SortedNode` when `by_end_point` is set (`MaterializedSpans` always
/// normalizes to start-point order, which isn't what end-point sort needs).
struct EndPointSortedSpans {
    hits: Vec<(i32, i32, i32)>,
    groups: Vec<(i32, usize, usize)>,
    group_idx: Option<usize>,
    row_idx: Option<usize>,
}

impl EndPointSortedSpans {
    fn new(hits: Vec<(i32, i32, i32)>) -> Self {
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
        EndPointSortedSpans { hits, groups, group_idx: None, row_idx: None }
    }
}

impl Spans for EndPointSortedSpans {
    fn next_doc(&mut self) -> Result<i32> {
        let next = match self.group_idx {
            None => 0,
            Some(g) => g + 1,
        };
        if next >= self.groups.len() {
            self.group_idx = Some(self.groups.len());
            return Ok(crate::spans::NO_MORE_DOCS);
        }
        self.group_idx = Some(next);
        self.row_idx = None;
        Ok(self.groups[next].0)
    }

    fn next_start_position(&mut self) -> Result<i32> {
        let g = match self.group_idx {
            Some(g) if g < self.groups.len() => g,
            _ => return Ok(crate::spans::NO_MORE_POSITIONS),
        };
        let (_, first, last) = self.groups[g];
        let next_row = match self.row_idx {
            None => first,
            Some(r) => r + 1,
        };
        if next_row >= last {
            return Ok(crate::spans::NO_MORE_POSITIONS);
        }
        self.row_idx = Some(next_row);
        Ok(self.hits[next_row].1)
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        loop {
            let doc = self.next_doc()?;
            if doc == crate::spans::NO_MORE_DOCS || doc >= target {
                return Ok(doc);
            }
        }
    }

    fn advance_start_position(&mut self, target: i32) -> Result<i32> {
        loop {
            let start = self.next_start_position()?;
            if start == crate::spans::NO_MORE_POSITIONS || start >= target {
                return Ok(start);
            }
        }
    }

    fn doc_id(&self) -> i32 {
        self.group_idx.and_then(|g| self.groups.get(g)).map(|g| g.0).unwrap_or(crate::spans::NO_MORE_DOCS)
    }

    fn start(&self) -> i32 {
        self.row_idx.map(|r| self.hits[r].1).unwrap_or(crate::spans::NO_MORE_POSITIONS)
    }

    fn end(&self) -> i32 {
        self.row_idx.map(|r| self.hits[r].2).unwrap_or(crate::spans::NO_MORE_POSITIONS)
    }
}

// ---------------------------------------------------------------------
// Unique
// ---------------------------------------------------------------------

/// Streaming dedupe of adjacent equal hits; requires start-sorted input
/// (§4.4). `Unique(Sorted(x))` is idempotent (T6).
#[derive(Debug)]
pub struct UniqueNode {
    pub child: Box<dyn SpanNode>,
}

impl UniqueNode {
    pub fn new(child: Box<dyn SpanNode>) -> Self {
        Self { child }
    }
}

impl SpanNode for UniqueNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        if self.child.properties().hits_are_unique {
            return self.child.rewrite();
        }
        Box::new(UniqueNode { child: self.child.rewrite() })
    }

    fn properties(&self) -> NodeProperties {
        let mut props = self.child.properties();
        props.hits_are_unique = true;
        props
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        self.child.reverse_matching_cost(ctx)
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let mut hits = collect(self.child.as_ref(), ctx)?;
        hits.sort_unstable();
        hits.dedup();
        Ok(Box::new(MaterializedSpans::new(hits)))
    }
}

// ---------------------------------------------------------------------
// Not
// ---------------------------------------------------------------------

/// Complement over the token universe of each doc (§4.4): every
/// width-1 span not covered by any hit of `child`.
#[derive(Debug)]
pub struct NotNode {
    pub child: Box<dyn SpanNode>,
    pub field: String,
}

impl NotNode {
    pub fn new(child: Box<dyn SpanNode>, field: impl Into<String>) -> Self {
        Self { child, field: field.into() }
    }
}

impl SpanNode for NotNode {
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode> {
        Box::new(NotNode { child: self.child.rewrite(), field: self.field })
    }

    fn properties(&self) -> NodeProperties {
        NodeProperties { hits_all_same_length: true, hits_length_min: 1, hits_length_max: Some(1), ..NodeProperties::term() }
    }

    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64 {
        ctx.postings.max_doc_in_segment().max(0) as u64
    }

    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>> {
        let max_doc = ctx.postings.max_doc_in_segment().max(0);
        let covered = collect(self.child.as_ref(), ctx)?;
        let mut covered_by_doc: HashMap<i32, Vec<(i32, i32)>> = HashMap::new();
        for (doc, start, end) in covered {
            covered_by_doc.entry(doc).or_default().push((start, end));
        }

        let mut result = Vec::new();
        for doc in 0..max_doc {
            let length = ctx.forward_index.doc_length(&self.field, doc)? as i32;
            let intervals = covered_by_doc.get(&doc);
            for pos in 0..length {
                let is_covered = intervals.map(|ivs| ivs.iter().any(|&(s, e)| pos >= s && pos < e)).unwrap_or(false);
                if !is_covered {
                    result.push((doc, pos, pos + 1));
                }
            }
        }
        Ok(Box::new(MaterializedSpans::new(result)))
    }
}
