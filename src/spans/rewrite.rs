// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared rewriter helpers (spec §4.4 rules 1-2).
//!
//! Rule 1: flatten associative nodes (`OR(OR(A,B), C) -> OR(A,B,C)`, same
//! for AND and Sequence). Rule 2: eliminate identity
//! (`Sequence(A) -> A`, `OR(A) -> A`).

use crate::spans::{NodeKind, SpanNode};

/// Rewrite every child, then flatten any child whose `kind()` equals
/// `own_kind` into this node's own child list (e.g. another `OrNode`'s
/// children spliced in while flattening an `Or`).
pub fn rewrite_and_flatten(children: Vec<Box<dyn SpanNode>>, own_kind: NodeKind) -> Vec<Box<dyn SpanNode>> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        let rewritten = child.rewrite();
        if rewritten.kind() == own_kind {
            flat.extend(rewritten.into_children());
        } else {
            flat.push(rewritten);
        }
    }
    flat
}
