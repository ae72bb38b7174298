// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! The `Spans` iterator contract (spec §4.4).
//!
//! A Spans iterator is a lazy, single-threaded, cooperative cursor over
//! `(doc, start, end)` triples. Every node in the query tree produces one
//! per segment via `SpanNode::spans_for_segment`.

use crate::error::Result;
use crate::spans::captures::CaptureSlots;

/// Sentinel returned by `next_doc`/`advance` once no more documents remain.
pub const NO_MORE_DOCS: i32 = i32::MAX;
/// Sentinel returned by `next_start_position`/`advance_start_position` once
/// no more positions remain within the current document.
pub const NO_MORE_POSITIONS: i32 = i32::MAX;

/// A lazy cursor over `(doc, start, end)` triples, in an order declared by
/// the producing node (§4.4's node catalogue). All methods are cheap,
/// bounded calls; no method blocks beyond one segment-file read.
pub trait Spans {
    /// Advance to the next doc containing at least one hit. Must be called
    /// before the first `next_start_position` call on a fresh iterator.
    fn next_doc(&mut self) -> Result<i32>;

    /// Advance within the current doc to the next start position.
    fn next_start_position(&mut self) -> Result<i32>;

    /// Skip forward to the first doc `>= target`. Equivalent to (but
    /// usually cheaper than) repeated `next_doc` calls.
    fn advance(&mut self, target: i32) -> Result<i32>;

    /// Skip forward, within the current doc, to the first start `>= target`.
    fn advance_start_position(&mut self, target: i32) -> Result<i32>;

    /// The current hit's doc id. Valid only between a successful
    /// `next_doc`/`advance` and the next one.
    fn doc_id(&self) -> i32;

    /// The current hit's start position. Valid only between a successful
    /// `next_start_position`/`advance_start_position` and the next one.
    fn start(&self) -> i32;

    /// The current hit's end position (exclusive).
    fn end(&self) -> i32;

    /// `end() - start()`.
    fn width(&self) -> i32 {
        self.end() - self.start()
    }

    /// Materialize any named-capture slots ancestor nodes set while
    /// producing the current hit. Default: no captures (most leaf and
    /// structural nodes don't introduce any).
    fn get_captured_groups(&self, _buf: &mut CaptureSlots) {}
}
