// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for the pasm assembler.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};

use patina::assembler::Assembler;
use patina::vm::artifact::BINARY_EXTENSION;

#[derive(Parser, Debug)]
#[command(
    name = "pasm",
    version,
    about = "Assembler producing .pvm stack VM program images"
)]
struct Cli {
    /// Input assembly source file (`.pasm`).
    input: PathBuf,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        long_help = "Output program image path. Defaults to the input path with its extension replaced by .pvm."
    )]
    output: Option<PathBuf>,
    #[arg(
        short = 'I',
        long = "include",
        value_name = "DIR",
        action = ArgAction::Append,
        long_help = "Add a directory to the include search roots (repeatable). Roots are searched in order; the input file's directory is always searched first."
    )]
    include: Vec<PathBuf>,
    #[arg(
        short = 'g',
        long = "debug-symbols",
        action = ArgAction::SetTrue,
        long_help = "Embed label names and addresses in the output image."
    )]
    debug_symbols: bool,
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension(BINARY_EXTENSION));

    let mut assembler = Assembler::new();
    assembler.set_debug_symbols(cli.debug_symbols);
    assembler.set_verbose(cli.verbose);
    if let Some(parent) = cli.input.parent() {
        assembler.add_include_path(parent);
    }
    for dir in &cli.include {
        assembler.add_include_path(dir);
    }

    if let Err(err) = assembler.translate_source_file(&cli.input) {
        eprintln!("[ERROR]: {err}");
        process::exit(1);
    }
    if let Err(err) = assembler.save_program_to_file(&output) {
        eprintln!("[ERROR]: {err}");
        process::exit(1);
    }
}
