// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-segment term sort order: `.termorder` (spec §3, §4.1).
//!
//! For each field, four parallel `i32` arrays of length `num_terms`:
//! `term_id_to_insensitive_pos`, `insensitive_pos_to_term_id`,
//! `term_id_to_sensitive_pos`, `sensitive_pos_to_term_id`.
//!
//! `pos_to_term_id` is the full stable sort permutation of term ids by
//! collated string (one entry per term, length `num_terms`), so
//! `pos_to_term_id[i]` is always the term id at full sorted rank `i`.
//! `term_id_to_pos` collapses collation-equal strings (e.g. differing only
//! in case under the insensitive collator) to a single shared sort position
//! (I3): `term_id_to_pos[pos_to_term_id[i]] == pos` for some `pos ≤ i`, with
//! `pos == i` iff `i == 0` or the term at rank `i` differs from the one at
//! rank `i - 1` under the collator (§4.1).

use std::cmp::Ordering;

use crate::fields::Sensitivity;

/// A collator: compares two term byte strings under one sensitivity.
///
/// The default collator is a simple, deterministic one good enough to
/// demonstrate and test the codec without pulling in a locale-aware
/// collation library (out of scope for the core, §1): sensitive compares
/// bytes directly; insensitive lowercases ASCII before comparing. A host
/// embedding the core may supply a fuller Unicode collator by implementing
/// this trait itself.
pub trait Collator {
    fn compare(&self, a: &[u8], b: &[u8], sensitivity: Sensitivity) -> Ordering;
}

/// The default ASCII-case-folding collator described above.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCollator;

impl Collator for DefaultCollator {
    fn compare(&self, a: &[u8], b: &[u8], sensitivity: Sensitivity) -> Ordering {
        match sensitivity {
            Sensitivity::Sensitive => a.cmp(b),
            Sensitivity::Insensitive => {
                let fold = |bytes: &[u8]| -> Vec<u8> { bytes.iter().map(|b| b.to_ascii_lowercase()).collect() };
                fold(a).cmp(&fold(b))
            }
        }
    }
}

/// The four `.termorder` arrays for one field, one sensitivity pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermOrder {
    pub term_id_to_insensitive_pos: Vec<i32>,
    pub insensitive_pos_to_term_id: Vec<i32>,
    pub term_id_to_sensitive_pos: Vec<i32>,
    pub sensitive_pos_to_term_id: Vec<i32>,
}

/// Build both sort orders for a field's terms (§4.1 step 5, §4.3 step 4):
/// stable sort by collator, collapsing collation-equal adjacent entries to
/// the same sort position (I2, I3).
pub fn build_term_order(terms: &[Vec<u8>], collator: &dyn Collator) -> TermOrder {
    let (sensitive_pos_to_term_id, term_id_to_sensitive_pos) =
        build_one_order(terms, collator, Sensitivity::Sensitive);
    let (insensitive_pos_to_term_id, term_id_to_insensitive_pos) =
        build_one_order(terms, collator, Sensitivity::Insensitive);

    TermOrder {
        term_id_to_insensitive_pos,
        insensitive_pos_to_term_id,
        term_id_to_sensitive_pos,
        sensitive_pos_to_term_id,
    }
}

/// Returns `(pos_to_term_id, term_id_to_pos)` for one sensitivity.
fn build_one_order(
    terms: &[Vec<u8>],
    collator: &dyn Collator,
    sensitivity: Sensitivity,
) -> (Vec<i32>, Vec<i32>) {
    let n = terms.len();
    let mut order: Vec<u32> = (0..n as u32).collect();
    // Stable sort: term id is the tiebreaker, so collation-equal terms keep
    // first-seen (i.e. term-id) relative order, matching "pos2TermID is a
    // stable sort" (spec §4.1).
    order.sort_by(|&a, &b| collator.compare(&terms[a as usize], &terms[b as usize], sensitivity));

    // `pos_to_term_id` keeps every element of the full stable sort order
    // (length n, §6.2's "four n_terms x i32 arrays"); `term_id_to_pos`
    // collapses collation-equal adjacent entries onto the group's first
    // (representative) rank (I3).
    let mut pos_to_term_id = Vec::with_capacity(n);
    let mut term_id_to_pos = vec![0i32; n];
    let mut current_pos: i32 = -1;
    let mut prev_term: Option<&[u8]> = None;

    for &term_id in &order {
        let term = terms[term_id as usize].as_slice();
        let is_new_group = match prev_term {
            None => true,
            Some(prev) => collator.compare(prev, term, sensitivity) != Ordering::Equal,
        };
        if is_new_group {
            current_pos += 1;
        }
        pos_to_term_id.push(term_id as i32);
        term_id_to_pos[term_id as usize] = current_pos;
        prev_term = Some(term);
    }

    (pos_to_term_id, term_id_to_pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn t2_sort_positions_respect_collator_order() {
        let terms = terms(&["banana", "apple", "cherry"]);
        let order = build_term_order(&terms, &DefaultCollator);

        // apple(1) < banana(0) < cherry(2) sensitively.
        let apple_pos = order.term_id_to_sensitive_pos[1];
        let banana_pos = order.term_id_to_sensitive_pos[0];
        let cherry_pos = order.term_id_to_sensitive_pos[2];
        assert!(apple_pos < banana_pos);
        assert!(banana_pos < cherry_pos);
    }

    #[test]
    fn i3_collation_equal_terms_share_sort_position() {
        // "the" and "The" collate equal insensitively.
        let terms = terms(&["the", "The", "cat"]);
        let order = build_term_order(&terms, &DefaultCollator);
        assert_eq!(
            order.term_id_to_insensitive_pos[0],
            order.term_id_to_insensitive_pos[1]
        );
        assert!(order.term_id_to_insensitive_pos[0] < order.term_id_to_insensitive_pos[2]);

        // But they differ sensitively (distinct byte strings).
        assert_ne!(
            order.term_id_to_sensitive_pos[0],
            order.term_id_to_sensitive_pos[1]
        );
    }

    #[test]
    fn i2_positions_are_dense_below_n() {
        let terms = terms(&["a", "b", "c", "d"]);
        let n = terms.len();
        let order = build_term_order(&terms, &DefaultCollator);
        for &p in &order.term_id_to_sensitive_pos {
            assert!((p as usize) < n);
        }
        for &p in &order.term_id_to_insensitive_pos {
            assert!((p as usize) < n);
        }
    }

    #[test]
    fn pos_to_term_id_is_full_length_stable_sort() {
        // `pos_to_term_id` holds every term, not just group representatives
        // (spec §6.2: "four n_terms x i32 arrays").
        let terms = terms(&["the", "The", "a", "cat"]);
        let order = build_term_order(&terms, &DefaultCollator);
        assert_eq!(order.insensitive_pos_to_term_id.len(), terms.len());
        assert_eq!(order.sensitive_pos_to_term_id.len(), terms.len());
    }

    #[test]
    fn q3_representative_round_trips_through_pos_to_term_id() {
        let terms = terms(&["the", "The", "a", "cat"]);
        let order = build_term_order(&terms, &DefaultCollator);
        // For every full sorted rank, looking the term back up gives a
        // collapsed position no greater than that rank (§4.1); equality
        // holds for rank 0 of every group (its representative, Q3), and the
        // number of distinct collapsed positions equals the number of
        // collation-equivalence classes (3: {the,The}, {a}, {cat}).
        let mut saw_exact_match = false;
        for (i, &term_id) in order.insensitive_pos_to_term_id.iter().enumerate() {
            let collapsed = order.term_id_to_insensitive_pos[term_id as usize];
            assert!(collapsed <= i as i32);
            saw_exact_match |= collapsed == i as i32;
        }
        assert!(saw_exact_match);
        let distinct_groups: std::collections::HashSet<i32> =
            order.term_id_to_insensitive_pos.iter().copied().collect();
        assert_eq!(distinct_groups.len(), 3);
    }

    #[test]
    fn single_term_field_has_one_position() {
        let terms = terms(&["only"]);
        let order = build_term_order(&terms, &DefaultCollator);
        assert_eq!(order.term_id_to_sensitive_pos, vec![0]);
        assert_eq!(order.sensitive_pos_to_term_id, vec![0]);
    }

    #[test]
    fn empty_field_has_empty_arrays() {
        let terms: Vec<Vec<u8>> = Vec::new();
        let order = build_term_order(&terms, &DefaultCollator);
        assert!(order.term_id_to_sensitive_pos.is_empty());
        assert!(order.sensitive_pos_to_term_id.is_empty());
    }
}
