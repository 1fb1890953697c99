// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The on-disk program image: a self-describing JSON document carried
//! by `.pvm` files.
//!
//! Operand words are stored with all three views spelled out; the
//! unsigned view is the authoritative bit pattern on load, so float
//! operands survive the trip even when the float view is not a JSON
//! number (NaN serializes as `null`).

use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::core::inst::{inst_def_by_code, inst_kind_code, InstDef};
use crate::core::word::Word;

/// Extension carried by program image files.
pub const BINARY_EXTENSION: &str = "pvm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSymbol {
    pub name: String,
    pub address: u64,
}

/// Everything the VM needs to run a program: entry point, instruction
/// list, initial memory image and optional label symbols.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Artifact {
    pub entry: u64,
    pub program: Vec<InstDef>,
    pub memory: Vec<u8>,
    pub debug_symbols: Vec<DebugSymbol>,
}

#[derive(Debug, Clone)]
pub struct ArtifactError {
    message: String,
}

impl ArtifactError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ArtifactError {}

impl Artifact {
    pub fn to_json(&self) -> Value {
        let program: Vec<Value> = self.program.iter().map(inst_to_json).collect();
        let mut doc = json!({
            "entry": self.entry,
            "program": program,
            "memory": self.memory,
        });
        if !self.debug_symbols.is_empty() {
            let symbols: Vec<Value> = self
                .debug_symbols
                .iter()
                .map(|symbol| json!({ "name": symbol.name, "address": symbol.address }))
                .collect();
            doc["debug_symbols"] = Value::Array(symbols);
        }
        doc
    }

    pub fn from_json(value: &Value) -> Result<Self, ArtifactError> {
        let entry = get_u64(value, "entry")?;
        let program = get_array(value, "program")?
            .iter()
            .map(inst_from_json)
            .collect::<Result<Vec<_>, _>>()?;
        let memory = get_array(value, "memory")?
            .iter()
            .map(|byte| {
                byte.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| ArtifactError::new("memory bytes must be in 0..=255"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let debug_symbols = match value.get("debug_symbols") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(symbol_from_json)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ArtifactError::new("field 'debug_symbols' must be a list"));
            }
        };
        Ok(Self {
            entry,
            program,
            memory,
            debug_symbols,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ArtifactError> {
        fs::write(path, self.to_json().to_string()).map_err(|err| {
            ArtifactError::new(format!("error writing '{}': {err}", path.display()))
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ArtifactError> {
        let content = fs::read_to_string(path).map_err(|err| {
            ArtifactError::new(format!("error reading file '{}': {err}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|err| {
            ArtifactError::new(format!(
                "error reading content of file '{}': {err}",
                path.display()
            ))
        })?;
        Self::from_json(&value)
    }
}

fn inst_to_json(inst: &InstDef) -> Value {
    let float_view = inst.operand.as_f64();
    // JSON has no NaN/infinity literal; those views decode from 'u64'.
    let float_value = if float_view.is_finite() {
        json!(float_view)
    } else {
        Value::Null
    };
    json!({
        "kind": inst_kind_code(inst.kind),
        "name": inst.name,
        "has_operand": inst.has_operand,
        "operand": {
            "i64": inst.operand.as_i64(),
            "u64": inst.operand.as_u64(),
            "f64": float_value,
        },
    })
}

fn inst_from_json(value: &Value) -> Result<InstDef, ArtifactError> {
    let code = get_u64(value, "kind")?;
    let def = inst_def_by_code(code)
        .ok_or_else(|| ArtifactError::new(format!("unknown instruction kind code {code}")))?;
    let operand = value
        .get("operand")
        .ok_or_else(|| ArtifactError::new("instruction is missing its 'operand' field"))?;
    let bits = get_u64(operand, "u64")?;
    Ok(def.with_operand(Word::from_u64(bits)))
}

fn symbol_from_json(value: &Value) -> Result<DebugSymbol, ArtifactError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ArtifactError::new("debug symbol field 'name' must be a string"))?;
    let address = get_u64(value, "address")?;
    Ok(DebugSymbol {
        name: name.to_string(),
        address,
    })
}

fn get_u64(value: &Value, key: &str) -> Result<u64, ArtifactError> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| ArtifactError::new(format!("field '{key}' must be an unsigned integer")))
}

fn get_array<'a>(value: &'a Value, key: &str) -> Result<&'a Vec<Value>, ArtifactError> {
    match value.get(key) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(ArtifactError::new(format!("field '{key}' must be a list"))),
    }
}
