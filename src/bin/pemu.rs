// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for the pemu emulator.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use patina::vm::Vm;

#[derive(Parser, Debug)]
#[command(name = "pemu", version, about = "Emulator running .pvm program images")]
struct Cli {
    /// Input program image (`.pvm`).
    input: PathBuf,
    #[arg(
        short = 'l',
        long = "limit",
        value_name = "N",
        default_value_t = -1,
        allow_negative_numbers = true,
        long_help = "Limit the steps of the emulation. If negative no limit is set."
    )]
    limit: i64,
}

fn main() {
    let cli = Cli::parse();

    let mut vm = Vm::new();
    if let Err(err) = vm.load_program_from_file(&cli.input) {
        eprintln!("[ERROR]: {err}");
        process::exit(1);
    }
    if let Err(err) = vm.execute_program(cli.limit) {
        eprintln!("{}: [ERROR]: {err}", cli.input.display());
        process::exit(1);
    }

    process::exit(vm.exit_code);
}
