// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error type for the whole translation pipeline.

use std::fmt;

use crate::core::location::FileLocation;

/// Categories of assembler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    Lex,
    UnexpectedToken,
    UnknownInstruction,
    UnknownDirective,
    UnknownBinding,
    DuplicateBinding,
    CyclicBinding,
    TypeMismatch,
    UnsupportedOperation,
    DivideByZero,
    EntryAlreadySet,
    EntryNotLabel,
    IncludeNotFound,
    IncludeDepthExceeded,
    BadFileExtension,
    Io,
}

/// An assembler error with a kind, a message and (when known) the source
/// location it was raised at.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: AsmErrorKind,
    message: String,
    location: Option<FileLocation>,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
            location: None,
        }
    }

    pub fn with_location(mut self, location: FileLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&FileLocation> {
        self.location.as_ref()
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AsmError {}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}
