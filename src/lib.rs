// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Segment-level forward index, global term space, and positional
//! span-query engine for a corpus search system.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │  codec::*    │────▶│  forward_index::*  │────▶│   spans::*   │
//! │ (writer,     │     │ (per-thread view   │     │ (query tree, │
//! │  reader)     │     │  over the codec)   │     │  Spans iter) │
//! └──────────────┘     └───────────────────┘     └──────┬───────┘
//!        │                                              │
//!        ▼                                              ▼
//! ┌──────────────┐                             ┌──────────────┐
//! │   terms::*   │                             │    nfa::*    │
//! │ (global term │                             │ (forward-idx │
//! │    space)    │                             │  NFA matcher)│
//! └──────────────┘                             └──────────────┘
//! ```
//!
//! None of the modules above know about any particular inverted-index
//! implementation; the only seam to the host is [`postings_source::PostingsSource`].

pub mod codec;
pub mod error;
pub mod fields;
pub mod forward_index;
pub mod nfa;
pub mod postings_source;
pub mod spans;
pub mod terms;

pub use error::{ConfigError, Error, FormatError, QueryError, Result};
pub use fields::{Bookkeeping, FieldName, Sensitivity};
pub use forward_index::{ForwardIndex, ForwardIndexView};
pub use postings_source::{MockPostingsSource, PostingsSource};
pub use terms::{GlobalTerms, GlobalTermsBuilder};
