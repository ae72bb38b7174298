// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Component D: the positional span-query engine (spec §4.4).
//!
//! A query is a tree of [`SpanNode`]s. Nodes own a flat `Vec<Box<dyn
//! SpanNode>>` of children rather than a deep generic hierarchy (§9
//! "Polymorphism of span nodes") — node composition is resolved at query
//! build time, not compile time, so trait objects are the right tool, the
//! same call the teacher makes for its own dynamically assembled pipeline
//! stages.

mod captures;
mod materialized;
mod nodes;
#[cfg(feature = "parallel")]
pub mod parallel;
mod rewrite;
mod spans_iter;

pub use captures::CaptureSlots;
pub use nodes::{
    AndNode, CaptureNode, ContainmentKind, ContainmentNode, FilterByDocSetNode, NotNode, OrNode,
    RepetitionNode, SequenceNode, SortedNode, TagSpansNode, TermNode, UniqueNode,
};
pub use spans_iter::{Spans, NO_MORE_DOCS, NO_MORE_POSITIONS};

use crate::error::Result;
use crate::forward_index::ForwardIndexView;
use crate::postings_source::PostingsSource;

/// Everything a node needs to produce a `Spans` iterator for one segment:
/// the forward index (cost estimates, NFA evaluation) and the inverted-index
/// adapter (postings for `Term` leaves). Bundled so `SpanNode` doesn't need
/// two separate by-reference parameters at every call site.
pub struct SegmentContext<'a> {
    pub forward_index: &'a ForwardIndexView,
    pub postings: &'a dyn PostingsSource,
}

/// Per-node predicates the rewriter uses to decide whether a wrapper
/// (`Sorted`, `Unique`, `noEmpty`) is already satisfied by a child (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeProperties {
    pub matches_empty_sequence: bool,
    pub hits_all_same_length: bool,
    pub hits_length_min: u32,
    pub hits_length_max: Option<u32>,
    pub hits_start_point_sorted: bool,
    pub hits_end_point_sorted: bool,
    pub hits_have_unique_start: bool,
    pub hits_have_unique_end: bool,
    pub hits_are_unique: bool,
}

/// Which associative family a node belongs to, used only by the rewriter's
/// flattening rule (§4.4 rule 1) to decide whether a rewritten child can be
/// spliced into its parent's child list. Kept as a plain tag rather than a
/// downcast: `Box<dyn SpanNode>` has no `Any` bound, and a tag is simpler
/// than adding one just for this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    And,
    Or,
    Sequence,
    Other,
}

impl NodeProperties {
    /// The properties of a single `Term` node: length-1 hits, already
    /// sorted and unique by construction (postings are strictly ordered).
    pub fn term() -> Self {
        NodeProperties {
            matches_empty_sequence: false,
            hits_all_same_length: true,
            hits_length_min: 1,
            hits_length_max: Some(1),
            hits_start_point_sorted: true,
            hits_end_point_sorted: true,
            hits_have_unique_start: true,
            hits_have_unique_end: true,
            hits_are_unique: true,
        }
    }
}

/// A node in the span-query tree (spec §4.4).
///
/// `rewrite` and `spans_for_segment` are the only operations a consumer
/// needs; the predicate accessors exist so the rewriter (and other nodes
/// composing this one) can make decisions without downcasting.
///
/// `Send + Sync` are supertraits (not just a derive on the concrete node
/// structs) so that `Box<dyn SpanNode>`/`&dyn SpanNode` themselves carry
/// those auto-traits: the `parallel` feature's segment-sharded search
/// (§5 "parallelism is achieved by sharding a query across segments")
/// shares one query tree by reference across worker threads.
pub trait SpanNode: std::fmt::Debug + Send + Sync {
    /// Rewrite this node into a semantically equivalent, optimized form.
    /// Default: return self unchanged (a leaf, or a node with nothing to
    /// optimize).
    fn rewrite(self: Box<Self>) -> Box<dyn SpanNode>;

    fn properties(&self) -> NodeProperties;

    /// This node's associative family, `Other` unless overridden (§4.4
    /// rule 1). Only `AndNode`, `OrNode`, and `SequenceNode` return
    /// anything else.
    fn kind(&self) -> NodeKind {
        NodeKind::Other
    }

    /// Consume this node and return its children. Only called by the
    /// rewriter when `kind()` matched the parent's own kind (rule 1), so the
    /// default — reached only by `Other`-kind nodes, which the rewriter
    /// never asks to flatten — is unreachable in practice.
    fn into_children(self: Box<Self>) -> Vec<Box<dyn SpanNode>> {
        unreachable!("into_children called on a node with kind() == Other")
    }

    /// Cost estimate used to decide which clause drives a join (§4.4 rule
    /// 6). Lower is cheaper. Not a guaranteed-accurate cardinality, just a
    /// comparison heuristic.
    fn reverse_matching_cost(&self, ctx: &SegmentContext<'_>) -> u64;

    /// Whether this subtree can be evaluated via the forward-index NFA
    /// matcher instead of the inverted index (§4.4 rule 7, §4.5).
    fn can_make_nfa(&self) -> bool {
        false
    }

    /// Produce a `Spans` iterator for one segment.
    fn spans_for_segment(&self, ctx: &SegmentContext<'_>) -> Result<Box<dyn Spans>>;
}
