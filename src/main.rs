// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! `blacklab-core` CLI: build and inspect segments.
//!
//! ```bash
//! # Build a segment from a JSON manifest
//! blacklab-core build --input docs.json --output ./segments --segment-id _0
//!
//! # Inspect the resulting field layout
//! blacklab-core inspect --input ./segments --segment-id _0
//! ```

use std::fs;
use std::path::Path;

use blacklab_core::codec::reader::SegmentCodecReader;
use blacklab_core::codec::writer::SegmentCodecWriter;
use blacklab_core::codec::SegmentFiles;
use blacklab_core::fields::Sensitivity;
use blacklab_core::MockPostingsSource;

mod cli;
use cli::manifest::Manifest;
use cli::{Cli, Commands};
use clap::Parser;

const EXTENSIONS: [&str; 6] = ["fields", "terms", "termindex", "termorder", "tokensindex", "tokens"];

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build { input, output, segment_id, delegate } => {
            build(&input, &output, &segment_id, &delegate, cli.verbose)
        }
        Commands::Inspect { input, segment_id } => inspect(&input, &segment_id, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn build(input: &str, output: &str, segment_id: &str, delegate: &str, verbose: bool) -> Result<(), String> {
    if verbose {
        eprintln!("reading manifest {input}");
    }
    let raw = fs::read_to_string(input).map_err(|e| format!("reading {input}: {e}"))?;
    let manifest: Manifest = serde_json::from_str(&raw).map_err(|e| format!("parsing {input}: {e}"))?;

    let docs: Vec<(String, Vec<Vec<String>>)> = manifest.fields.into_iter().collect();
    let source = MockPostingsSource::from_primary_tokens(docs);

    if verbose {
        eprintln!("writing segment {segment_id} with delegate {delegate}");
    }
    let files = SegmentCodecWriter::new(segment_id, delegate).write_segment(&source, |_| true);

    fs::create_dir_all(output).map_err(|e| format!("creating {output}: {e}"))?;

    #[cfg(feature = "parallel")]
    let progress = build_progress_bar(EXTENSIONS.len() as u64);

    for ext in EXTENSIONS {
        let bytes = files.extension_bytes(ext).expect("known extension");
        let path = Path::new(output).join(format!("{segment_id}.{ext}"));
        fs::write(&path, bytes).map_err(|e| format!("writing {}: {e}", path.display()))?;
        if verbose {
            eprintln!("wrote {} ({} bytes)", path.display(), bytes.len());
        }
        #[cfg(feature = "parallel")]
        progress.inc(1);
    }
    #[cfg(feature = "parallel")]
    progress.finish_and_clear();

    println!("built segment {segment_id} in {output} ({} docs)", source_doc_count(&source));
    Ok(())
}

/// A bar over the fixed set of per-segment files written by `build`. Hidden
/// automatically by `indicatif` when stderr isn't a terminal (piped output,
/// CI logs), so it never pollutes non-interactive runs.
#[cfg(feature = "parallel")]
fn build_progress_bar(len: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(len);
    bar.set_style(
        indicatif::ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    bar.set_message("writing segment files");
    bar
}

fn source_doc_count(source: &MockPostingsSource) -> usize {
    use blacklab_core::PostingsSource;
    source.max_doc_in_segment().max(0) as usize
}

fn inspect(input: &str, segment_id: &str, verbose: bool) -> Result<(), String> {
    if verbose {
        eprintln!("reading segment {segment_id} from {input}");
    }
    let mut files = SegmentFiles::default();
    for ext in EXTENSIONS {
        let path = Path::new(input).join(format!("{segment_id}.{ext}"));
        let bytes = fs::read(&path).map_err(|e| format!("reading {}: {e}", path.display()))?;
        set_extension(&mut files, ext, bytes);
    }

    let reader = SegmentCodecReader::open(&files).map_err(|e| format!("opening segment: {e}"))?;
    let color = atty::is(atty::Stream::Stdout);

    println!("{}", heading(&format!("segment {segment_id}"), color));
    println!("  delegate: {}", reader.delegate_name());
    println!("  docs:     {}", reader.num_docs());
    println!("  fields:   {}", reader.fields().len());
    for field in reader.fields() {
        println!("    - {} ({} terms)", heading(&field.name, color), field.num_terms);
        if verbose {
            let terms = reader.terms(&field.name).map_err(|e| format!("reading terms: {e}"))?;
            for (id, term) in terms.iter().enumerate() {
                let sens_pos = reader
                    .sort_pos(&field.name, id as i32, Sensitivity::Sensitive)
                    .map_err(|e| format!("reading sort_pos: {e}"))?;
                println!("        [{id}] {:?} (sensitive sort pos {sens_pos})", String::from_utf8_lossy(term));
            }
        }
    }
    Ok(())
}

/// Wrap `text` in bold ANSI codes when stdout is a terminal, plain otherwise
/// (piped output, redirected files, CI logs never get escape codes).
fn heading(text: &str, color: bool) -> String {
    if color {
        format!("\x1b[1m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn set_extension(files: &mut SegmentFiles, ext: &str, bytes: Vec<u8>) {
    match ext {
        "fields" => files.fields = bytes,
        "terms" => files.terms = bytes,
        "termindex" => files.termindex = bytes,
        "termorder" => files.termorder = bytes,
        "tokensindex" => files.tokensindex = bytes,
        "tokens" => files.tokens = bytes,
        _ => unreachable!("unknown extension {ext}"),
    }
}
