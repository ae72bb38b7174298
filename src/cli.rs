// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! `blacklab-core` CLI: build and inspect segments (spec §9 "Ambient CLI").
//!
//! This is developer tooling, not a spec'd component — the core has no
//! DocIndexer of its own (out of scope, §1), so `build` reads a minimal
//! JSON manifest instead. It exists only so a segment can be produced and
//! inspected end-to-end without a host inverted-index implementation.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blacklab-core", about = "Segment forward-index codec builder and inspector", version)]
pub struct Cli {
    /// Print diagnostics to stderr as each step runs.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a segment's forward-index files from a JSON manifest.
    Build {
        /// Path to a manifest JSON file (see [`crate::cli::manifest::Manifest`]).
        #[arg(short, long)]
        input: String,

        /// Output directory; writes `<segment_id>.<ext>` for each extension.
        #[arg(short, long)]
        output: String,

        /// Segment id to stamp into every extension file's header.
        #[arg(long, default_value = "_0")]
        segment_id: String,

        /// Delegate name to stamp into every extension file's header.
        #[arg(long, default_value = "blacklab-core")]
        delegate: String,
    },

    /// Inspect a segment's extension files and print its field layout.
    Inspect {
        /// Directory containing `<segment_id>.<ext>` files.
        #[arg(short, long)]
        input: String,

        /// Segment id to load.
        #[arg(long, default_value = "_0")]
        segment_id: String,
    },
}

pub mod manifest {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    /// A minimal stand-in for the host's DocIndexer output: per field, a
    /// list of documents, each a list of primary-annotation token strings
    /// (spec §9's "minimal stand-in for the out-of-scope DocIndexer").
    #[derive(Debug, Deserialize)]
    pub struct Manifest {
        pub fields: BTreeMap<String, Vec<Vec<String>>>,
    }
}
