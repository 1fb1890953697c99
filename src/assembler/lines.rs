// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Groups the token stream into logical source lines.
//!
//! A line is a label (`name:`), a directive (`%name …`) or an
//! instruction (`name …`). Directive and instruction operands are kept
//! as token slices for the expression parser.

use crate::assembler::error::{AsmError, AsmErrorKind};
use crate::assembler::tokenizer::{Token, TokenKind};
use crate::core::location::FileLocation;

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Label {
        name: String,
        location: FileLocation,
    },
    Instruction {
        name: String,
        operand: Vec<Token>,
        location: FileLocation,
    },
    Directive {
        name: String,
        block: Vec<Token>,
        location: FileLocation,
    },
}

impl Line {
    pub fn location(&self) -> &FileLocation {
        match self {
            Line::Label { location, .. }
            | Line::Instruction { location, .. }
            | Line::Directive { location, .. } => location,
        }
    }
}

/// Classify a token stream into logical lines. Empty lines are skipped.
pub fn linize(tokens: Vec<Token>) -> Result<Vec<Line>, AsmError> {
    let mut out = Vec::new();
    for group in tokens.split(|t| t.kind == TokenKind::NewLine) {
        if group.is_empty() {
            continue;
        }
        out.push(classify(group)?);
    }
    Ok(out)
}

fn classify(group: &[Token]) -> Result<Line, AsmError> {
    let first = &group[0];
    let location = first.location.clone();

    if first.kind == TokenKind::Symbol
        && group.get(1).is_some_and(|t| t.kind == TokenKind::Colon)
    {
        if let Some(extra) = group.get(2) {
            return Err(AsmError::new(
                AsmErrorKind::UnexpectedToken,
                "expecting end of line after label",
                Some(&first.text),
            )
            .with_location(extra.location.clone()));
        }
        return Ok(Line::Label {
            name: first.text.clone(),
            location,
        });
    }

    if first.kind == TokenKind::Percent {
        let name = match group.get(1) {
            Some(t) if t.kind == TokenKind::Symbol => t.text.clone(),
            _ => {
                return Err(AsmError::new(
                    AsmErrorKind::UnexpectedToken,
                    "expecting directive name after '%'",
                    None,
                )
                .with_location(location))
            }
        };
        return Ok(Line::Directive {
            name,
            block: group[2..].to_vec(),
            location,
        });
    }

    if first.kind == TokenKind::Symbol {
        return Ok(Line::Instruction {
            name: first.text.clone(),
            operand: group[1..].to_vec(),
            location,
        });
    }

    Err(AsmError::new(
        AsmErrorKind::UnexpectedToken,
        "expecting a label, instruction or directive",
        None,
    )
    .with_location(location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::tokenizer::tokenize;

    fn lines_of(source: &str) -> Result<Vec<Line>, AsmError> {
        linize(tokenize(source, "t.pasm").unwrap())
    }

    #[test]
    fn classifies_the_three_line_kinds() {
        let lines = lines_of("loop:\npush 1\n%entry loop\n").unwrap();
        assert_eq!(lines.len(), 3);
        assert!(matches!(&lines[0], Line::Label { name, .. } if name == "loop"));
        assert!(
            matches!(&lines[1], Line::Instruction { name, operand, .. } if name == "push" && operand.len() == 1)
        );
        assert!(
            matches!(&lines[2], Line::Directive { name, block, .. } if name == "entry" && block.len() == 1)
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let lines = lines_of("\n\nnoop\n\n").unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn instruction_operand_keeps_all_trailing_tokens() {
        let lines = lines_of("push 2+3*4\n").unwrap();
        let Line::Instruction { operand, .. } = &lines[0] else {
            panic!("expected instruction");
        };
        assert_eq!(operand.len(), 5);
    }

    #[test]
    fn label_with_trailing_tokens_is_rejected() {
        let err = lines_of("loop: push 1\n").unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::UnexpectedToken);
    }

    #[test]
    fn directive_without_name_is_rejected() {
        let err = lines_of("% 12\n").unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::UnexpectedToken);
    }

    #[test]
    fn line_starting_with_operator_is_rejected() {
        let err = lines_of("+ 1\n").unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::UnexpectedToken);
        assert_eq!(err.location().unwrap().row, 0);
    }
}
