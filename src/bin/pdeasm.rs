// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for the pdeasm disassembler: a plain walk over the
// decoded program image.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use patina::vm::artifact::Artifact;

#[derive(Parser, Debug)]
#[command(name = "pdeasm", version, about = "Disassembler for .pvm program images")]
struct Cli {
    /// Input program image (`.pvm`).
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let artifact = match Artifact::load_from_file(&cli.input) {
        Ok(artifact) => artifact,
        Err(err) => {
            eprintln!("[ERROR]: {err}");
            process::exit(1);
        }
    };

    println!("Entry point: {}", artifact.entry);
    for inst in &artifact.program {
        if inst.has_operand {
            println!("{} {}", inst.name, inst.operand);
        } else {
            println!("{}", inst.name);
        }
    }

    if !artifact.debug_symbols.is_empty() {
        println!("Debug symbols:");
        for symbol in &artifact.debug_symbols {
            println!("  {} -> {}", symbol.name, symbol.address);
        }
    }
}
