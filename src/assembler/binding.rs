// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Symbol table for labels, constants and memory regions.
//!
//! Bindings live in an ordered list and are looked up by linear scan;
//! translation units are small enough that nothing faster pays off.

use crate::assembler::error::{AsmError, AsmErrorKind};
use crate::assembler::expression::{EvalKind, Expression};
use crate::core::location::FileLocation;
use crate::core::word::Word;

/// Demand-driven evaluation state of a binding. `Evaluating` marks a
/// binding currently on the evaluation stack; hitting it again is a
/// definition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStatus {
    Unevaluated,
    Evaluating,
    Evaluated,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub status: BindingStatus,
    pub name: String,
    pub value: Expression,
    pub word: Word,
    pub kind: EvalKind,
    pub location: FileLocation,
    pub is_label: bool,
}

/// A name reference inside an emitted instruction, waiting for the
/// second pass to patch the operand at `address`.
#[derive(Debug, Clone)]
pub struct DeferredOperand {
    pub name: String,
    pub address: usize,
    pub location: FileLocation,
}

#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bindings.iter().position(|b| b.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn at(&self, index: usize) -> &Binding {
        &self.bindings[index]
    }

    pub fn at_mut(&mut self, index: usize) -> &mut Binding {
        &mut self.bindings[index]
    }

    pub fn entries(&self) -> &[Binding] {
        &self.bindings
    }

    /// Insert a binding, rejecting redefinitions of the name.
    pub fn insert(&mut self, binding: Binding) -> Result<(), AsmError> {
        if let Some(existing) = self.get(&binding.name) {
            return Err(AsmError::new(
                AsmErrorKind::DuplicateBinding,
                &format!(
                    "name '{}' is already bound at location '{}'",
                    binding.name, existing.location
                ),
                None,
            )
            .with_location(binding.location));
        }
        self.bindings.push(binding);
        Ok(())
    }

    /// Bind a label to an instruction address. Labels are evaluated at
    /// creation.
    pub fn bind_label(
        &mut self,
        name: &str,
        address: usize,
        location: FileLocation,
    ) -> Result<(), AsmError> {
        self.insert(Binding {
            status: BindingStatus::Evaluated,
            name: name.to_string(),
            value: Expression::NumLitInt(address as i64),
            word: Word::from_u64(address as u64),
            kind: EvalKind::Int,
            location,
            is_label: true,
        })
    }
}
