// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The VM's 64-bit value cell and type-directed arithmetic.
//!
//! A [`Word`] is a single untyped 64-bit cell. Callers pick the view
//! (signed, unsigned or float) at the call site via a [`TypeRep`]; the
//! cell itself carries no runtime tag.

use std::fmt;

/// A 64-bit cell with signed/unsigned/float views over the same bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Word(u64);

impl Word {
    pub const ZERO: Word = Word(0);

    pub fn from_i64(value: i64) -> Self {
        Self(value as u64)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn from_f64(value: f64) -> Self {
        Self(value.to_bits())
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(i64: {}, u64: {}, f64: {})",
            self.as_i64(),
            self.as_u64(),
            self.as_f64()
        )
    }
}

/// The view under which an arithmetic helper interprets its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRep {
    I64,
    U64,
    F64,
}

/// Add two words under the given view. Integer views wrap.
pub fn add_word(a: Word, b: Word, rep: TypeRep) -> Word {
    match rep {
        TypeRep::I64 => Word::from_i64(a.as_i64().wrapping_add(b.as_i64())),
        TypeRep::U64 => Word::from_u64(a.as_u64().wrapping_add(b.as_u64())),
        TypeRep::F64 => Word::from_f64(a.as_f64() + b.as_f64()),
    }
}

/// Subtract `b` from `a` under the given view. Integer views wrap.
pub fn sub_word(a: Word, b: Word, rep: TypeRep) -> Word {
    match rep {
        TypeRep::I64 => Word::from_i64(a.as_i64().wrapping_sub(b.as_i64())),
        TypeRep::U64 => Word::from_u64(a.as_u64().wrapping_sub(b.as_u64())),
        TypeRep::F64 => Word::from_f64(a.as_f64() - b.as_f64()),
    }
}

/// Multiply two words under the given view. Integer views wrap.
pub fn mul_word(a: Word, b: Word, rep: TypeRep) -> Word {
    match rep {
        TypeRep::I64 => Word::from_i64(a.as_i64().wrapping_mul(b.as_i64())),
        TypeRep::U64 => Word::from_u64(a.as_u64().wrapping_mul(b.as_u64())),
        TypeRep::F64 => Word::from_f64(a.as_f64() * b.as_f64()),
    }
}

/// Divide `a` by `b` under the given view.
///
/// Callers must reject a zero divisor first; the integer views wrap on
/// the single overflowing case (`i64::MIN / -1`).
pub fn div_word(a: Word, b: Word, rep: TypeRep) -> Word {
    match rep {
        TypeRep::I64 => Word::from_i64(a.as_i64().wrapping_div(b.as_i64())),
        TypeRep::U64 => Word::from_u64(a.as_u64().wrapping_div(b.as_u64())),
        TypeRep::F64 => Word::from_f64(a.as_f64() / b.as_f64()),
    }
}

/// Remainder of `a / b` under the given view. Same caller contract as
/// [`div_word`].
pub fn mod_word(a: Word, b: Word, rep: TypeRep) -> Word {
    match rep {
        TypeRep::I64 => Word::from_i64(a.as_i64().wrapping_rem(b.as_i64())),
        TypeRep::U64 => Word::from_u64(a.as_u64().wrapping_rem(b.as_u64())),
        TypeRep::F64 => Word::from_f64(a.as_f64() % b.as_f64()),
    }
}
