// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembler translating `.pasm` sources into `.pvm` program images.
//!
//! The pipeline is tokenizer → line classifier → IR builder (with
//! recursive include expansion) → two-pass symbol resolution → binary
//! emission. Pass 1 emits instructions and records operands that
//! reference not-yet-bound names; pass 2 resolves those references,
//! patches the emitted program and materializes the entry point.

pub mod binding;
pub mod error;
pub mod expression;
pub mod lines;
pub mod tokenizer;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::inst::{inst_def_by_name, InstDef, InstKind};
use crate::core::location::FileLocation;
use crate::core::word::{add_word, div_word, mod_word, mul_word, sub_word, TypeRep, Word};
use crate::vm::artifact::{Artifact, DebugSymbol, BINARY_EXTENSION};

use binding::{Binding, BindingStatus, BindingTable, DeferredOperand};
use expression::{parse_expr, EvalKind, Expression};
use lines::{linize, Line};
use tokenizer::{tokenize, TokenKind};

pub use error::{AsmError, AsmErrorKind};

/// Extension carried by assembly source files.
pub const SOURCE_EXTENSION: &str = "pasm";

/// Maximum nesting depth of `%include` expansion.
pub const MAX_INCLUDE_LEVEL: usize = 10;

/// Intermediate representation of one source line, with include
/// directives already expanded away.
#[derive(Debug, Clone)]
enum Ir {
    Label {
        name: String,
        location: FileLocation,
    },
    Instruction {
        def: InstDef,
        operand: Option<Expression>,
        location: FileLocation,
    },
    Entry {
        name: String,
        location: FileLocation,
    },
    Const {
        name: String,
        value: Expression,
        location: FileLocation,
    },
    Memory {
        name: String,
        value: Expression,
        location: FileLocation,
    },
}

/// Result of evaluating an expression: the word and the type it was
/// computed under.
#[derive(Debug, Clone, Copy)]
pub struct EvalResult {
    pub word: Word,
    pub kind: EvalKind,
}

#[derive(Debug, Default)]
pub struct Assembler {
    bindings: BindingTable,
    deferred_operands: Vec<DeferredOperand>,
    program: Vec<InstDef>,

    has_entry: bool,
    entry: u64,
    entry_location: FileLocation,
    deferred_entry_name: String,

    memory: Vec<u8>,
    string_lengths: HashMap<usize, usize>,

    include_level: usize,
    include_paths: Vec<PathBuf>,

    add_debug_symbols: bool,
    verbose: bool,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory to the ordered include search roots.
    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) {
        self.include_paths.push(path.into());
    }

    pub fn set_debug_symbols(&mut self, enabled: bool) {
        self.add_debug_symbols = enabled;
    }

    pub fn set_verbose(&mut self, enabled: bool) {
        self.verbose = enabled;
    }

    pub fn program(&self) -> &[InstDef] {
        &self.program
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn entry(&self) -> u64 {
        self.entry
    }

    pub fn has_entry(&self) -> bool {
        self.has_entry
    }

    /// Translate an assembly source file into an in-memory program.
    pub fn translate_source_file(&mut self, path: &Path) -> Result<(), AsmError> {
        let source = read_source_file(path)?;
        if self.verbose {
            println!("[INFO]: Building program '{}'", path.display());
        }
        self.translate_source(&source, &path.display().to_string())?;
        if self.verbose {
            println!("[INFO]: Built program '{}'", path.display());
        }
        Ok(())
    }

    /// Translate a source string. `file_path` is used for locations only.
    pub fn translate_source(&mut self, source: &str, file_path: &str) -> Result<(), AsmError> {
        let tokens = tokenize(source, file_path)?;
        let lines = linize(tokens)?;
        let irs = self.translate_ir(lines)?;
        self.first_pass(irs)?;
        self.second_pass()
    }

    /// Build the program artifact from the translated state.
    pub fn artifact(&self) -> Artifact {
        let mut debug_symbols = Vec::new();
        if self.add_debug_symbols {
            for binding in self.bindings.entries() {
                if binding.is_label {
                    debug_symbols.push(DebugSymbol {
                        name: binding.name.clone(),
                        address: binding.word.as_u64(),
                    });
                }
            }
        }
        Artifact {
            entry: self.entry,
            program: self.program.clone(),
            memory: self.memory.clone(),
            debug_symbols,
        }
    }

    /// Serialize the translated program to a `.pvm` file.
    pub fn save_program_to_file(&self, path: &Path) -> Result<(), AsmError> {
        if path.extension().and_then(|e| e.to_str()) != Some(BINARY_EXTENSION) {
            return Err(AsmError::new(
                AsmErrorKind::BadFileExtension,
                &format!(
                    "file '{}' is not a valid .{BINARY_EXTENSION} file",
                    path.display()
                ),
                None,
            ));
        }
        self.artifact().save_to_file(path).map_err(|err| {
            AsmError::new(
                AsmErrorKind::Io,
                &format!("error saving file '{}'", path.display()),
                Some(&err.to_string()),
            )
        })?;
        println!("[INFO]: Program saved to '{}'", path.display());
        Ok(())
    }

    fn translate_ir(&mut self, lines: Vec<Line>) -> Result<Vec<Ir>, AsmError> {
        let mut out = Vec::new();
        for line in lines {
            match line {
                Line::Label { name, location } => out.push(Ir::Label { name, location }),
                Line::Instruction {
                    name,
                    operand,
                    location,
                } => {
                    let Some(def) = inst_def_by_name(&name) else {
                        return Err(AsmError::new(
                            AsmErrorKind::UnknownInstruction,
                            "unknown instruction",
                            Some(&name),
                        )
                        .with_location(location));
                    };
                    let operand_expr = if def.has_operand {
                        Some(parse_expr(&operand, &location)?)
                    } else if let Some(extra) = operand.first() {
                        return Err(AsmError::new(
                            AsmErrorKind::UnexpectedToken,
                            &format!("instruction '{name}' takes no operand"),
                            None,
                        )
                        .with_location(extra.location.clone()));
                    } else {
                        None
                    };
                    out.push(Ir::Instruction {
                        def,
                        operand: operand_expr,
                        location,
                    });
                }
                Line::Directive {
                    name,
                    block,
                    location,
                } => match name.as_str() {
                    "entry" => match block.as_slice() {
                        [token] if token.kind == TokenKind::Symbol => out.push(Ir::Entry {
                            name: token.text.clone(),
                            location,
                        }),
                        _ => {
                            return Err(AsmError::new(
                                AsmErrorKind::UnexpectedToken,
                                "expecting a label name after '%entry'",
                                None,
                            )
                            .with_location(location));
                        }
                    },
                    "const" => {
                        let (name, value) = split_binding_directive(&block, &location)?;
                        out.push(Ir::Const {
                            name,
                            value,
                            location,
                        });
                    }
                    "memory" => {
                        let (name, value) = split_binding_directive(&block, &location)?;
                        out.push(Ir::Memory {
                            name,
                            value,
                            location,
                        });
                    }
                    "include" => match block.as_slice() {
                        [token] if token.kind == TokenKind::StringLit => {
                            let included = self.translate_include(&token.text, &location)?;
                            out.extend(included);
                        }
                        _ => {
                            return Err(AsmError::new(
                                AsmErrorKind::UnexpectedToken,
                                "expecting a quoted file path after '%include'",
                                None,
                            )
                            .with_location(location));
                        }
                    },
                    _ => {
                        return Err(AsmError::new(
                            AsmErrorKind::UnknownDirective,
                            "unknown directive",
                            Some(&name),
                        )
                        .with_location(location));
                    }
                },
            }
        }
        Ok(out)
    }

    fn translate_include(
        &mut self,
        path: &str,
        location: &FileLocation,
    ) -> Result<Vec<Ir>, AsmError> {
        let Some(resolved) = self.resolve_include_path(path) else {
            return Err(AsmError::new(
                AsmErrorKind::IncludeNotFound,
                "cannot resolve include file",
                Some(path),
            )
            .with_location(location.clone()));
        };
        if self.include_level >= MAX_INCLUDE_LEVEL {
            return Err(AsmError::new(
                AsmErrorKind::IncludeDepthExceeded,
                "maximum include level reached",
                None,
            )
            .with_location(location.clone()));
        }

        self.include_level += 1;
        let source = read_source_file(&resolved)?;
        if self.verbose {
            println!("[INFO]: Including '{}'", resolved.display());
        }
        let tokens = tokenize(&source, &resolved.display().to_string())?;
        let irs = self.translate_ir(linize(tokens)?)?;
        self.include_level -= 1;
        Ok(irs)
    }

    // First hit in the ordered search roots wins.
    fn resolve_include_path(&self, path: &str) -> Option<PathBuf> {
        self.include_paths
            .iter()
            .map(|root| root.join(path))
            .find(|candidate| candidate.exists())
    }

    fn first_pass(&mut self, irs: Vec<Ir>) -> Result<(), AsmError> {
        for ir in irs {
            match ir {
                Ir::Label { name, location } => {
                    self.bindings
                        .bind_label(&name, self.program.len(), location)?;
                }
                Ir::Instruction {
                    mut def,
                    operand,
                    location,
                } => {
                    if def.has_operand {
                        match operand {
                            Some(Expression::Binding(name)) => {
                                self.deferred_operands.push(DeferredOperand {
                                    name,
                                    address: self.program.len(),
                                    location,
                                });
                            }
                            Some(expr) => {
                                def.operand = self.evaluate_expression(&expr, &location)?.word;
                            }
                            None => {}
                        }
                    }
                    self.program.push(def);
                }
                Ir::Entry { name, location } => self.bind_entry(name, location)?,
                Ir::Const {
                    name,
                    value,
                    location,
                } => self.bind_const(&name, value, location)?,
                Ir::Memory {
                    name,
                    value,
                    location,
                } => self.bind_memory(&name, value, location)?,
            }
        }
        Ok(())
    }

    fn second_pass(&mut self) -> Result<(), AsmError> {
        let deferred = std::mem::take(&mut self.deferred_operands);
        for op in &deferred {
            let Some(index) = self.bindings.index_of(&op.name) else {
                return Err(AsmError::new(
                    AsmErrorKind::UnknownBinding,
                    "unknown binding",
                    Some(&op.name),
                )
                .with_location(op.location.clone()));
            };
            let result = self.evaluate_binding(index, &op.location)?;
            self.program[op.address].operand = result.word;
        }

        if self.has_entry && !self.deferred_entry_name.is_empty() {
            let name = std::mem::take(&mut self.deferred_entry_name);
            let location = self.entry_location.clone();
            let Some(index) = self.bindings.index_of(&name) else {
                return Err(AsmError::new(
                    AsmErrorKind::UnknownBinding,
                    "unknown binding",
                    Some(&name),
                )
                .with_location(location));
            };
            if !matches!(self.bindings.at(index).value, Expression::NumLitInt(_)) {
                return Err(AsmError::new(
                    AsmErrorKind::EntryNotLabel,
                    "only label names can be set as entry point",
                    None,
                )
                .with_location(location));
            }
            let result = self.evaluate_binding(index, &location)?;
            self.entry = result.word.as_u64();
        }

        if self.include_level == 0
            && !self.program.iter().any(|inst| inst.kind == InstKind::Halt)
        {
            println!(
                "[WARN]: no 'halt' instruction found in the program! This program could not work as intended."
            );
        }
        Ok(())
    }

    fn bind_entry(&mut self, name: String, location: FileLocation) -> Result<(), AsmError> {
        if self.has_entry {
            return Err(AsmError::new(
                AsmErrorKind::EntryAlreadySet,
                &format!("entry point is already set at '{}'", self.entry_location),
                None,
            )
            .with_location(location));
        }
        self.deferred_entry_name = name;
        self.has_entry = true;
        self.entry_location = location;
        Ok(())
    }

    fn bind_const(
        &mut self,
        name: &str,
        value: Expression,
        location: FileLocation,
    ) -> Result<(), AsmError> {
        // String constants are materialized in memory right away and
        // bound to their base address.
        let binding = if let Expression::StringLit(text) = &value {
            let base = self.push_string_to_memory(text);
            Binding {
                status: BindingStatus::Evaluated,
                name: name.to_string(),
                value,
                word: Word::from_u64(base as u64),
                kind: EvalKind::Str,
                location,
                is_label: false,
            }
        } else {
            Binding {
                status: BindingStatus::Unevaluated,
                name: name.to_string(),
                value,
                word: Word::ZERO,
                kind: EvalKind::Int,
                location,
                is_label: false,
            }
        };
        self.bindings.insert(binding)
    }

    fn bind_memory(
        &mut self,
        name: &str,
        value: Expression,
        location: FileLocation,
    ) -> Result<(), AsmError> {
        let Expression::ByteList(bytes) = &value else {
            return Err(AsmError::new(
                AsmErrorKind::TypeMismatch,
                "expecting a byte list as '%memory' value",
                Some(name),
            )
            .with_location(location));
        };
        let base = self.memory.len();
        self.memory.extend_from_slice(bytes);
        self.bindings.insert(Binding {
            status: BindingStatus::Evaluated,
            name: name.to_string(),
            value,
            word: Word::from_u64(base as u64),
            kind: EvalKind::Bytes,
            location,
            is_label: false,
        })
    }

    fn evaluate_binding(
        &mut self,
        index: usize,
        location: &FileLocation,
    ) -> Result<EvalResult, AsmError> {
        match self.bindings.at(index).status {
            BindingStatus::Evaluated => {
                let binding = self.bindings.at(index);
                Ok(EvalResult {
                    word: binding.word,
                    kind: binding.kind,
                })
            }
            BindingStatus::Evaluating => Err(AsmError::new(
                AsmErrorKind::CyclicBinding,
                "cyclic binding definition detected",
                Some(&self.bindings.at(index).name),
            )
            .with_location(location.clone())),
            BindingStatus::Unevaluated => {
                self.bindings.at_mut(index).status = BindingStatus::Evaluating;
                let value = self.bindings.at(index).value.clone();
                let result = self.evaluate_expression(&value, location)?;
                let binding = self.bindings.at_mut(index);
                binding.status = BindingStatus::Evaluated;
                binding.word = result.word;
                binding.kind = result.kind;
                Ok(result)
            }
        }
    }

    pub(crate) fn evaluate_expression(
        &mut self,
        expr: &Expression,
        location: &FileLocation,
    ) -> Result<EvalResult, AsmError> {
        match expr {
            Expression::Binding(name) => {
                let Some(index) = self.bindings.index_of(name) else {
                    return Err(AsmError::new(
                        AsmErrorKind::UnknownBinding,
                        "cannot find binding",
                        Some(name),
                    )
                    .with_location(location.clone()));
                };
                self.evaluate_binding(index, location)
            }
            Expression::NumLitInt(value) => Ok(EvalResult {
                word: Word::from_i64(*value),
                kind: EvalKind::Int,
            }),
            Expression::NumLitFloat(value) => Ok(EvalResult {
                word: Word::from_f64(*value),
                kind: EvalKind::Float,
            }),
            Expression::StringLit(text) => {
                let base = self.push_string_to_memory(text);
                Ok(EvalResult {
                    word: Word::from_u64(base as u64),
                    kind: EvalKind::Str,
                })
            }
            Expression::BinaryOp { kind, lhs, rhs } => {
                self.evaluate_binary_op(*kind, lhs, rhs, location)
            }
            Expression::ByteList(_) => Err(AsmError::new(
                AsmErrorKind::UnsupportedOperation,
                "cannot use byte lists as operands, only supported use is in memory directives",
                None,
            )
            .with_location(location.clone())),
        }
    }

    fn evaluate_binary_op(
        &mut self,
        op: expression::BinaryOpKind,
        lhs: &Expression,
        rhs: &Expression,
        location: &FileLocation,
    ) -> Result<EvalResult, AsmError> {
        use expression::BinaryOpKind;

        let lhs = self.evaluate_expression(lhs, location)?;
        let rhs = self.evaluate_expression(rhs, location)?;

        let result_kind = match (lhs.kind, rhs.kind) {
            (EvalKind::Int, EvalKind::Int) => EvalKind::Int,
            (EvalKind::Int, EvalKind::Float)
            | (EvalKind::Float, EvalKind::Int)
            | (EvalKind::Float, EvalKind::Float) => EvalKind::Float,
            (EvalKind::Str, EvalKind::Str) => EvalKind::Str,
            (left, right) => {
                return Err(AsmError::new(
                    AsmErrorKind::TypeMismatch,
                    &format!(
                        "unsupported binary operation between types '{}' and '{}'",
                        left.name(),
                        right.name()
                    ),
                    None,
                )
                .with_location(location.clone()));
            }
        };

        if result_kind == EvalKind::Str {
            if op != BinaryOpKind::Plus {
                return Err(AsmError::new(
                    AsmErrorKind::UnsupportedOperation,
                    "unsupported operations ['-', '*', '/', '%'] between string literals",
                    None,
                )
                .with_location(location.clone()));
            }
            let left = self.get_string_by_address(lhs.word.as_u64() as usize);
            let right = self.get_string_by_address(rhs.word.as_u64() as usize);
            let base = self.push_string_to_memory(&(left + &right));
            return Ok(EvalResult {
                word: Word::from_u64(base as u64),
                kind: EvalKind::Str,
            });
        }

        // An integer operand of a mixed operation is widened to the
        // float view so the arithmetic happens in one domain.
        let (rep, a, b) = if result_kind == EvalKind::Float {
            (TypeRep::F64, widen_to_float(lhs), widen_to_float(rhs))
        } else {
            (TypeRep::I64, lhs.word, rhs.word)
        };

        let word = match op {
            BinaryOpKind::Plus => add_word(a, b, rep),
            BinaryOpKind::Minus => sub_word(a, b, rep),
            BinaryOpKind::Times => mul_word(a, b, rep),
            BinaryOpKind::Divide => {
                if divisor_is_zero(b, rep) {
                    return Err(AsmError::new(AsmErrorKind::DivideByZero, "divide by zero", None)
                        .with_location(location.clone()));
                }
                div_word(a, b, rep)
            }
            BinaryOpKind::Modulo => {
                if rep == TypeRep::F64 {
                    return Err(AsmError::new(
                        AsmErrorKind::UnsupportedOperation,
                        "unsupported '%' operation between floating point literals",
                        None,
                    )
                    .with_location(location.clone()));
                }
                if divisor_is_zero(b, rep) {
                    return Err(AsmError::new(AsmErrorKind::DivideByZero, "divide by zero", None)
                        .with_location(location.clone()));
                }
                mod_word(a, b, rep)
            }
        };
        Ok(EvalResult {
            word,
            kind: result_kind,
        })
    }

    /// Append a NUL-terminated string to memory, returning its base
    /// address. The total length (terminator included) is remembered so
    /// concatenation can read the content back without scanning.
    fn push_string_to_memory(&mut self, text: &str) -> usize {
        let base = self.memory.len();
        self.memory.extend_from_slice(text.as_bytes());
        self.memory.push(0);
        self.string_lengths.insert(base, text.len() + 1);
        base
    }

    /// Read back a string previously pushed at `base`, without its NUL
    /// terminator. Unknown addresses yield an empty string.
    fn get_string_by_address(&self, base: usize) -> String {
        match self.string_lengths.get(&base) {
            Some(&len) => String::from_utf8_lossy(&self.memory[base..base + len - 1]).into_owned(),
            None => String::new(),
        }
    }
}

fn widen_to_float(result: EvalResult) -> Word {
    match result.kind {
        EvalKind::Int => Word::from_f64(result.word.as_i64() as f64),
        _ => result.word,
    }
}

fn divisor_is_zero(divisor: Word, rep: TypeRep) -> bool {
    match rep {
        TypeRep::I64 => divisor.as_i64() == 0,
        TypeRep::U64 => divisor.as_u64() == 0,
        TypeRep::F64 => divisor.as_f64() == 0.0,
    }
}

// `%const` and `%memory` blocks are a name followed by a value
// expression.
fn split_binding_directive(
    block: &[tokenizer::Token],
    location: &FileLocation,
) -> Result<(String, Expression), AsmError> {
    match block.first() {
        Some(token) if token.kind == TokenKind::Symbol => {
            let value = parse_expr(&block[1..], location)?;
            Ok((token.text.clone(), value))
        }
        _ => Err(AsmError::new(
            AsmErrorKind::UnexpectedToken,
            "expecting a binding name",
            None,
        )
        .with_location(location.clone())),
    }
}

/// Read an assembly source file, enforcing the source extension.
fn read_source_file(path: &Path) -> Result<String, AsmError> {
    if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        return Err(AsmError::new(
            AsmErrorKind::BadFileExtension,
            &format!(
                "file '{}' is not a valid .{SOURCE_EXTENSION} file",
                path.display()
            ),
            None,
        ));
    }
    fs::read_to_string(path).map_err(|err| {
        AsmError::new(
            AsmErrorKind::Io,
            &format!("error reading file '{}'", path.display()),
            Some(&err.to_string()),
        )
    })
}
