// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Component E: the forward-index NFA matcher (spec §4.5).
//!
//! Compiles a query fragment to an NFA whose alphabet is term ids and walks
//! it position-by-position against the forward index, instead of the
//! inverted index, when the rewriter judges a clause cheaper to evaluate
//! this way (§4.4 rule 7).
//!
//! Grounded directly on `levenshtein_dfa.rs`'s `ParametricState`/transition
//! stepping: an NFA here is an active *set* of state indices stepped in
//! lockstep against one input symbol per position, same as that file steps
//! a set of `NfaPos` against one character class per position. Generalized
//! from characters to term-id predicates and from Levenshtein
//! edit-transitions to plain token/split/accept transitions (DESIGN.md).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::codec::termorder::Collator;
use crate::error::Result;
use crate::fields::Sensitivity;
use crate::forward_index::ForwardIndexView;

/// Direction to walk a document's token stream (§4.5): `+1` for ordinary
/// left-to-right matching, `-1` to evaluate a "left of hit" clause by
/// matching backwards from a starting position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// One state in the compiled NFA (§4.5 "NFA states").
#[derive(Debug, Clone)]
enum NfaState {
    /// Matches any term id in `term_ids` (a predicate already expanded at
    /// compile time to a concrete set of ids, §4.5) and transitions to
    /// `next`.
    Token { term_ids: HashSet<i32>, next: usize },
    /// Non-deterministic fork (§4.5 "OR / split state"). `prefer_out1`
    /// marks `out1` as the preferred continuation for longest-match
    /// semantics; matching itself (success/failure) doesn't depend on it,
    /// only a caller that wants the longest rather than the first match
    /// would consult it.
    Split { out1: usize, out2: usize, prefer_out1: bool },
    Accept,
}

/// A query fragment to compile into an NFA, before term-id expansion.
/// Mirrors the small set of operators the span-query engine needs to hand
/// off to the forward index: a literal (under a sensitivity), concatenation,
/// bounded/unbounded repetition, and alternation.
#[derive(Debug, Clone)]
pub enum NfaExpr {
    /// A literal term string under a sensitivity; expanded at compile time
    /// against one segment's forward index (§4.5's "expanded once per
    /// segment via the global terms service" — here, directly against the
    /// segment's own term table, since matching itself is per-segment).
    Literal { field: String, term: Vec<u8>, sensitivity: Sensitivity },
    Concat(Vec<NfaExpr>),
    /// Zero or more repetitions (`A*`).
    Star(Box<NfaExpr>),
    /// One or more repetitions (`A+`).
    Plus(Box<NfaExpr>),
    /// Zero or one repetition (`A?`).
    Opt(Box<NfaExpr>),
    /// Alternation (`A|B|...`).
    Alt(Vec<NfaExpr>),
}

/// The compiled, immutable NFA (§4.5: "pure data; matching against it holds
/// no per-segment locks"). Build once per `(segment, query fragment)` via
/// [`Nfa::compile`], then call [`Nfa::matches_at`] as many times as needed.
#[derive(Debug)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: usize,
    direction: Direction,
}

impl Nfa {
    /// Compile `expr` for one segment's forward index, in `direction`.
    /// Term predicates are expanded once here, not on every match call.
    pub fn compile(expr: &NfaExpr, direction: Direction, view: &ForwardIndexView, collator: &dyn Collator) -> Result<Self> {
        let mut states = Vec::new();
        let accept = push(&mut states, NfaState::Accept);
        let start = compile_expr(expr, accept, &mut states, view, collator)?;
        Ok(Nfa { states, start, direction })
    }

    /// Does this NFA match starting at `start_pos` in `doc`? Walks
    /// positions in `direction`, testing the active state set's term-id
    /// predicates against the forward index at each position (§4.5).
    pub fn matches_at(&self, view: &ForwardIndexView, field: &str, doc: i32, start_pos: i32) -> Result<bool> {
        let mut active = self.epsilon_closure(&BTreeSet::from([self.start]));
        if self.has_accept(&active) {
            return Ok(true);
        }

        let length = view.doc_length(field, doc)? as i32;
        let mut pos = start_pos;
        let step = self.direction.step();

        loop {
            if pos < 0 || pos >= length {
                return Ok(false);
            }
            let token = view.doc_tokens(field, doc, pos as usize, pos as usize + 1)?;
            let term_id = match token.first() {
                Some(&t) => t,
                None => return Ok(false),
            };

            let mut next = BTreeSet::new();
            for &s in &active {
                if let NfaState::Token { term_ids, next: n } = &self.states[s] {
                    if term_ids.contains(&term_id) {
                        next.insert(*n);
                    }
                }
            }
            if next.is_empty() {
                return Ok(false);
            }
            active = self.epsilon_closure(&next);
            if self.has_accept(&active) {
                return Ok(true);
            }
            pos += step;
        }
    }

    fn has_accept(&self, active: &BTreeSet<usize>) -> bool {
        active.iter().any(|&s| matches!(self.states[s], NfaState::Accept))
    }

    /// Expand a set of state indices through every reachable `Split`
    /// (epsilon transition), leaving `Token`/`Accept` states as the
    /// closure's frontier.
    fn epsilon_closure(&self, seed: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<usize> = seed.iter().copied().collect();
        while let Some(s) = stack.pop() {
            if !closure.insert(s) {
                continue;
            }
            if let NfaState::Split { out1, out2, .. } = &self.states[s] {
                stack.push(*out1);
                stack.push(*out2);
            }
        }
        closure
    }
}

/// Caches compiled [`Nfa`] values keyed by `K` (typically a `(segment id,
/// query fragment)` pair) so that matching the same fragment against the
/// same segment repeatedly doesn't recompile it — recompilation re-expands
/// every literal against the segment's term table, which is the cost
/// `compile` exists to pay once. Guarded by a `parking_lot::RwLock` rather
/// than a `std::sync::Mutex`: lookups (the common case, once a fragment has
/// been compiled once per segment) only need read access and can run
/// concurrently across the `parallel` feature's worker threads.
#[derive(Debug)]
pub struct NfaCache<K: Eq + Hash> {
    entries: RwLock<HashMap<K, Arc<Nfa>>>,
}

impl<K: Eq + Hash + Clone> NfaCache<K> {
    pub fn new() -> Self {
        NfaCache { entries: RwLock::new(HashMap::new()) }
    }

    /// Return the cached NFA for `key`, compiling and inserting it via
    /// `compile` on a miss. `compile` is only invoked when no entry for
    /// `key` is already present.
    pub fn get_or_compile(&self, key: K, compile: impl FnOnce() -> Result<Nfa>) -> Result<Arc<Nfa>> {
        if let Some(nfa) = self.entries.read().get(&key) {
            return Ok(Arc::clone(nfa));
        }
        let nfa = Arc::new(compile()?);
        self.entries.write().entry(key).or_insert_with(|| Arc::clone(&nfa));
        Ok(nfa)
    }

    /// Number of distinct keys currently cached, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for NfaCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn push(states: &mut Vec<NfaState>, state: NfaState) -> usize {
    states.push(state);
    states.len() - 1
}

/// Every segment-local term id in `field` whose string satisfies `term`
/// under `sensitivity` (§4.5's predicate expansion, done directly against
/// the forward index's own term table rather than routing through the
/// global terms service, since matching is inherently per-segment).
fn expand_literal(
    field: &str,
    term: &[u8],
    sensitivity: Sensitivity,
    view: &ForwardIndexView,
    collator: &dyn Collator,
) -> Result<HashSet<i32>> {
    let terms = view.terms(field)?;
    Ok(terms
        .iter()
        .enumerate()
        .filter(|(_, t)| collator.compare(t, term, sensitivity) == std::cmp::Ordering::Equal)
        .map(|(id, _)| id as i32)
        .collect())
}

/// Continuation-passing compilation: `compile_expr(expr, k)` returns the
/// entry state of a fragment that, on success, transitions to `k`. This
/// lets `Concat` chain fragments right-to-left without forward references,
/// and `Star`/`Opt` install a `Split` whose loop-back target is the
/// fragment's own entry state.
fn compile_expr(
    expr: &NfaExpr,
    k: usize,
    states: &mut Vec<NfaState>,
    view: &ForwardIndexView,
    collator: &dyn Collator,
) -> Result<usize> {
    match expr {
        NfaExpr::Literal { field, term, sensitivity } => {
            let term_ids = expand_literal(field, term, *sensitivity, view, collator)?;
            Ok(push(states, NfaState::Token { term_ids, next: k }))
        }
        NfaExpr::Concat(parts) => {
            let mut cont = k;
            for part in parts.iter().rev() {
                cont = compile_expr(part, cont, states, view, collator)?;
            }
            Ok(cont)
        }
        NfaExpr::Star(inner) => {
            let split = push(states, NfaState::Accept); // placeholder, overwritten below
            let inner_start = compile_expr(inner, split, states, view, collator)?;
            states[split] = NfaState::Split { out1: inner_start, out2: k, prefer_out1: true };
            Ok(split)
        }
        NfaExpr::Plus(inner) => {
            // A+ == A . A*
            let star = NfaExpr::Star(inner.clone());
            compile_expr(&NfaExpr::Concat(vec![(**inner).clone(), star]), k, states, view, collator)
        }
        NfaExpr::Opt(inner) => {
            let inner_start = compile_expr(inner, k, states, view, collator)?;
            Ok(push(states, NfaState::Split { out1: inner_start, out2: k, prefer_out1: true }))
        }
        NfaExpr::Alt(branches) => {
            let mut entries = Vec::with_capacity(branches.len());
            for b in branches {
                entries.push(compile_expr(b, k, states, view, collator)?);
            }
            let mut entries = entries.into_iter();
            let mut acc = entries.next().expect("Alt with no branches");
            for e in entries {
                acc = push(states, NfaState::Split { out1: acc, out2: e, prefer_out1: true });
            }
            Ok(acc)
        }
    }
}

/// `can_make_nfa()` support (§4.4 rule 7): whether a query fragment is
/// expressible as an [`NfaExpr`] at all. Literals, sequences, and bounded
/// or unbounded repetitions of literals always are; anything involving
/// containment, capture groups, or negation is not (those need the full
/// span-query machinery, §4.4).
pub fn is_nfa_compatible(expr: &NfaExpr) -> bool {
    match expr {
        NfaExpr::Literal { .. } => true,
        NfaExpr::Concat(parts) | NfaExpr::Alt(parts) => parts.iter().all(is_nfa_compatible),
        NfaExpr::Star(inner) | NfaExpr::Plus(inner) | NfaExpr::Opt(inner) => is_nfa_compatible(inner),
    }
}
