// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction set shared by the assembler and the VM.

use crate::core::word::Word;

/// Every instruction the VM can execute.
///
/// The signed integer mul/div/mod forms compute the same result as
/// their unsigned counterparts; the pairs differ only in which view the
/// zero-divisor guard inspects. The distinct mnemonics are kept on
/// purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstKind {
    Noop,
    Push,
    Swap,
    Dup,
    Drop,
    Halt,
    AddInt,
    SubInt,
    MulInt,
    MulIntSigned,
    DivInt,
    DivIntSigned,
    ModInt,
    ModIntSigned,
    AddFloat,
    SubFloat,
    MulFloat,
    DivFloat,
    Cmp,
    Jmp,
    JmpZero,
    JmpNotZero,
    JmpGreater,
    JmpLess,
    JmpGreaterEqual,
    JmpLessEqual,
    FunCall,
    FunReturn,
    MemRead,
    MemWrite,
    Syscall,
    Print,
}

/// An instruction as it appears in an assembled program: its kind, the
/// mnemonic it was written as, and the operand word (zero when unused).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstDef {
    pub kind: InstKind,
    pub name: &'static str,
    pub has_operand: bool,
    pub operand: Word,
}

impl InstDef {
    const fn new(kind: InstKind, name: &'static str, has_operand: bool) -> Self {
        Self {
            kind,
            name,
            has_operand,
            operand: Word::ZERO,
        }
    }

    pub fn with_operand(mut self, operand: Word) -> Self {
        self.operand = operand;
        self
    }
}

/// The instruction table, in stable order. The position of an entry is
/// its on-disk kind code.
pub const INST_DEFS: [InstDef; 32] = [
    InstDef::new(InstKind::Noop, "noop", false),
    InstDef::new(InstKind::Push, "push", true),
    InstDef::new(InstKind::Swap, "swap", true),
    InstDef::new(InstKind::Dup, "dup", false),
    InstDef::new(InstKind::Drop, "drop", false),
    InstDef::new(InstKind::Halt, "halt", false),
    InstDef::new(InstKind::AddInt, "addi", false),
    InstDef::new(InstKind::SubInt, "subi", false),
    InstDef::new(InstKind::MulInt, "muli", false),
    InstDef::new(InstKind::MulIntSigned, "mulis", false),
    InstDef::new(InstKind::DivInt, "divi", false),
    InstDef::new(InstKind::DivIntSigned, "divis", false),
    InstDef::new(InstKind::ModInt, "modi", false),
    InstDef::new(InstKind::ModIntSigned, "modis", false),
    InstDef::new(InstKind::AddFloat, "addf", false),
    InstDef::new(InstKind::SubFloat, "subf", false),
    InstDef::new(InstKind::MulFloat, "mulf", false),
    InstDef::new(InstKind::DivFloat, "divf", false),
    InstDef::new(InstKind::Cmp, "cmp", false),
    InstDef::new(InstKind::Jmp, "jmp", true),
    InstDef::new(InstKind::JmpZero, "jz", true),
    InstDef::new(InstKind::JmpNotZero, "jnz", true),
    InstDef::new(InstKind::JmpGreater, "jg", true),
    InstDef::new(InstKind::JmpLess, "jl", true),
    InstDef::new(InstKind::JmpGreaterEqual, "jge", true),
    InstDef::new(InstKind::JmpLessEqual, "jle", true),
    InstDef::new(InstKind::FunCall, "call", true),
    InstDef::new(InstKind::FunReturn, "ret", false),
    InstDef::new(InstKind::MemRead, "memr", false),
    InstDef::new(InstKind::MemWrite, "memw", false),
    InstDef::new(InstKind::Syscall, "syscall", true),
    InstDef::new(InstKind::Print, "print", false),
];

/// Look up an instruction template by mnemonic.
pub fn inst_def_by_name(name: &str) -> Option<InstDef> {
    INST_DEFS.iter().copied().find(|def| def.name == name)
}

/// Look up an instruction template by its on-disk kind code.
pub fn inst_def_by_code(code: u64) -> Option<InstDef> {
    usize::try_from(code)
        .ok()
        .and_then(|ix| INST_DEFS.get(ix))
        .copied()
}

/// The on-disk kind code of an instruction kind. Variant order matches
/// the table order.
pub fn inst_kind_code(kind: InstKind) -> u64 {
    kind as u64
}
