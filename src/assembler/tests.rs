// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end translation tests: source text in, assembled program (and
//! sometimes a running VM) out.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::*;
use crate::vm::{ExecError, Vm};

fn assemble(source: &str) -> Result<Assembler, AsmError> {
    let mut assembler = Assembler::new();
    assembler.translate_source(source, "test.pasm")?;
    Ok(assembler)
}

fn assemble_and_run(source: &str) -> Vm {
    let assembler = assemble(source).unwrap();
    let mut vm = Vm::new();
    vm.load_artifact(assembler.artifact()).unwrap();
    vm.execute_program(-1).unwrap();
    vm
}

fn top(vm: &Vm) -> Word {
    vm.stack[vm.stack_size - 1]
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn make_temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "patina-asm-{}-{nanos}-{counter}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("temp dir for include tests");
    dir
}

#[test]
fn push_add_halt_executes_to_a_sum() {
    let vm = assemble_and_run("push 1\npush 2\naddi\nhalt\n");
    assert!(vm.halt);
    assert_eq!(vm.exit_code, 0);
    assert_eq!(top(&vm).as_u64(), 3);
}

#[test]
fn constant_expressions_fold_before_emission() {
    let vm = assemble_and_run("%const N 2+3*4+5\npush N\nhalt\n");
    assert_eq!(top(&vm).as_i64(), 19);
}

#[test]
fn string_constants_intern_and_concatenate_in_memory() {
    let assembler = assemble(
        "%const A \"foo\"\n%const B \"bar\"\n%const AB A+B\npush AB\nhalt\n",
    )
    .unwrap();
    assert_eq!(assembler.memory(), b"foo\0bar\0foobar\0");
    assert_eq!(assembler.program()[0].operand.as_u64(), 8);
}

#[test]
fn step_limited_loop_returns_without_error() {
    let assembler = assemble("loop:\npush 1\njmp loop\nhalt\n").unwrap();
    let mut vm = Vm::new();
    vm.load_artifact(assembler.artifact()).unwrap();
    vm.execute_program(5).unwrap();
    assert!(!vm.halt);
    assert!(vm.ip <= 1);
}

#[test]
fn cyclic_constants_are_rejected() {
    let err = assemble("%const X Y\n%const Y X\npush X\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::CyclicBinding);
}

#[test]
fn runtime_division_by_zero_surfaces() {
    let assembler = assemble("push 1\npush 0\ndivi\nhalt\n").unwrap();
    let mut vm = Vm::new();
    vm.load_artifact(assembler.artifact()).unwrap();
    assert_eq!(vm.execute_program(-1), Err(ExecError::DivideByZero));
}

#[test]
fn forward_references_are_patched_in_the_second_pass() {
    let assembler = assemble("jmp end\npush 1\nend:\nhalt\n").unwrap();
    assert_eq!(assembler.program()[0].operand.as_u64(), 2);
    let vm = assemble_and_run("jmp end\npush 1\nend:\nhalt\n");
    assert!(vm.halt);
    assert_eq!(vm.stack_size, 0);
}

#[test]
fn program_length_matches_instruction_count() {
    let assembler = assemble("start:\nnoop\n%const N 1\npush N\nmid:\nhalt\n").unwrap();
    assert_eq!(assembler.program().len(), 3);
}

#[test]
fn labels_bind_to_the_next_instruction_index() {
    let mut assembler = Assembler::new();
    assembler.set_debug_symbols(true);
    assembler
        .translate_source("noop\nl1:\nnoop\nl2:\nhalt\n", "test.pasm")
        .unwrap();
    let artifact = assembler.artifact();
    let find = |name: &str| {
        artifact
            .debug_symbols
            .iter()
            .find(|s| s.name == name)
            .unwrap()
            .address
    };
    assert_eq!(find("l1"), 1);
    assert_eq!(find("l2"), 2);
}

#[test]
fn debug_symbols_cover_labels_only() {
    let mut assembler = Assembler::new();
    assembler.set_debug_symbols(true);
    assembler
        .translate_source("%const N 1\nstart:\npush N\nhalt\n", "test.pasm")
        .unwrap();
    let artifact = assembler.artifact();
    assert_eq!(artifact.debug_symbols.len(), 1);
    assert_eq!(artifact.debug_symbols[0].name, "start");

    assembler.set_debug_symbols(false);
    assert!(assembler.artifact().debug_symbols.is_empty());
}

#[test]
fn entry_directive_resolves_to_a_label_address() {
    let assembler = assemble("%entry main\nnoop\nmain:\nhalt\n").unwrap();
    assert!(assembler.has_entry());
    assert_eq!(assembler.entry(), 1);
}

#[test]
fn entry_must_name_an_integer_binding() {
    let err = assemble("%const S \"x\"\n%entry S\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::EntryNotLabel);
}

#[test]
fn entry_cannot_be_set_twice() {
    let err = assemble("main:\nhalt\n%entry main\n%entry main\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::EntryAlreadySet);
}

#[test]
fn unknown_entry_name_is_reported() {
    let err = assemble("%entry nowhere\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::UnknownBinding);
}

#[test]
fn memory_directive_reserves_bytes_and_binds_the_base() {
    let vm = assemble_and_run(
        "%memory first [1, 2, 3]\n%memory second [0xff,]\npush second\nmemr\nhalt\n",
    );
    assert_eq!(&vm.memory[..4], &[1, 2, 3, 0xff]);
    assert_eq!(top(&vm).as_u64(), 0xff);
}

#[test]
fn memory_directive_requires_a_byte_list() {
    let err = assemble("%memory buf 17\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::TypeMismatch);
}

#[test]
fn byte_lists_cannot_be_instruction_operands() {
    let err = assemble("push [1, 2]\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::UnsupportedOperation);
}

#[test]
fn char_literal_operands_become_code_points() {
    let vm = assemble_and_run("push 'a'\nhalt\n");
    assert_eq!(top(&vm).as_i64(), 97);
}

#[test]
fn mixed_int_float_constants_evaluate_as_floats() {
    let vm = assemble_and_run("%const X 1+2.5\npush X\nhalt\n");
    assert_eq!(top(&vm).as_f64(), 3.5);
}

#[test]
fn integer_bindings_support_modulo_at_evaluation_time() {
    let vm = assemble_and_run("%const A 5\npush A%2\nhalt\n");
    assert_eq!(top(&vm).as_i64(), 1);
}

#[test]
fn constants_resolve_through_other_constants() {
    let vm = assemble_and_run("%const A B+1\n%const B 2\npush A\nhalt\n");
    assert_eq!(top(&vm).as_i64(), 3);
}

#[test]
fn string_typed_operands_push_the_base_address() {
    let assembler = assemble("%const S \"hi\"\npush S\nhalt\n").unwrap();
    assert_eq!(assembler.program()[0].operand.as_u64(), 0);
    assert_eq!(assembler.memory(), b"hi\0");
}

#[test]
fn unknown_instruction_is_reported_with_location() {
    let err = assemble("noop\nfrobnicate 1\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::UnknownInstruction);
    assert_eq!(err.location().unwrap().row, 1);
}

#[test]
fn unknown_directive_is_reported() {
    let err = assemble("%macro foo\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::UnknownDirective);
}

#[test]
fn unresolved_operand_name_is_reported() {
    let err = assemble("push nowhere\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::UnknownBinding);
}

#[test]
fn duplicate_labels_are_rejected() {
    let err = assemble("x:\nnoop\nx:\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::DuplicateBinding);
}

#[test]
fn operandless_instructions_reject_operands() {
    let err = assemble("halt 5\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::UnexpectedToken);
}

#[test]
fn operand_taking_instructions_require_one() {
    let err = assemble("push\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::UnexpectedToken);
}

#[test]
fn type_mismatched_operations_are_rejected() {
    let err = assemble("%const S \"x\"\npush S+1\nhalt\n").unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::TypeMismatch);
}

#[test]
fn includes_splice_bindings_into_the_translation_unit() {
    let dir = make_temp_dir();
    fs::write(dir.join("lib.pasm"), "%const N 2+3*4+5\n").unwrap();

    let mut assembler = Assembler::new();
    assembler.add_include_path(&dir);
    assembler
        .translate_source("%include \"lib.pasm\"\npush N\nhalt\n", "test.pasm")
        .unwrap();
    assert_eq!(assembler.program()[0].operand.as_i64(), 19);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn include_roots_are_searched_in_order() {
    let first = make_temp_dir();
    let second = make_temp_dir();
    fs::write(first.join("lib.pasm"), "%const N 1\n").unwrap();
    fs::write(second.join("lib.pasm"), "%const N 2\n").unwrap();

    let mut assembler = Assembler::new();
    assembler.add_include_path(&first);
    assembler.add_include_path(&second);
    assembler
        .translate_source("%include \"lib.pasm\"\npush N\nhalt\n", "test.pasm")
        .unwrap();
    assert_eq!(assembler.program()[0].operand.as_i64(), 1);

    fs::remove_dir_all(&first).unwrap();
    fs::remove_dir_all(&second).unwrap();
}

#[test]
fn unresolvable_includes_are_reported() {
    let dir = make_temp_dir();
    let mut assembler = Assembler::new();
    assembler.add_include_path(&dir);
    let err = assembler
        .translate_source("%include \"nope.pasm\"\nhalt\n", "test.pasm")
        .unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::IncludeNotFound);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn self_including_files_hit_the_depth_cap() {
    let dir = make_temp_dir();
    fs::write(dir.join("self.pasm"), "%include \"self.pasm\"\n").unwrap();

    let mut assembler = Assembler::new();
    assembler.add_include_path(&dir);
    let err = assembler
        .translate_source("%include \"self.pasm\"\nhalt\n", "test.pasm")
        .unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::IncludeDepthExceeded);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn included_files_must_carry_the_source_extension() {
    let dir = make_temp_dir();
    fs::write(dir.join("bad.txt"), "noop\n").unwrap();

    let mut assembler = Assembler::new();
    assembler.add_include_path(&dir);
    let err = assembler
        .translate_source("%include \"bad.txt\"\nhalt\n", "test.pasm")
        .unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::BadFileExtension);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn source_files_must_carry_the_source_extension() {
    let dir = make_temp_dir();
    let path = dir.join("main.txt");
    fs::write(&path, "halt\n").unwrap();

    let mut assembler = Assembler::new();
    let err = assembler.translate_source_file(&path).unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::BadFileExtension);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn translate_source_file_assembles_from_disk() {
    let dir = make_temp_dir();
    let path = dir.join("main.pasm");
    fs::write(&path, "push 6\npush 7\nmuli\nhalt\n").unwrap();

    let mut assembler = Assembler::new();
    assembler.translate_source_file(&path).unwrap();
    let mut vm = Vm::new();
    vm.load_artifact(assembler.artifact()).unwrap();
    vm.execute_program(-1).unwrap();
    assert_eq!(top(&vm).as_u64(), 42);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn saved_programs_reload_to_an_identical_image() {
    let dir = make_temp_dir();
    let path = dir.join("out.pvm");

    let assembler = assemble("%entry main\nmain:\npush 1\nhalt\n").unwrap();
    assembler.save_program_to_file(&path).unwrap();

    let mut vm = Vm::new();
    vm.load_program_from_file(&path).unwrap();
    assert_eq!(vm.ip, assembler.entry());
    assert_eq!(vm.program, assembler.program());
    assert_eq!(&vm.memory[..assembler.memory().len()], assembler.memory());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn output_files_must_carry_the_binary_extension() {
    let assembler = assemble("halt\n").unwrap();
    let err = assembler
        .save_program_to_file(std::path::Path::new("out.bin"))
        .unwrap_err();
    assert_eq!(err.kind(), AsmErrorKind::BadFileExtension);
}

#[test]
fn comments_and_blank_lines_do_not_emit_instructions() {
    let assembler = assemble("; header\n\nnoop ; trailing\n\nhalt\n").unwrap();
    assert_eq!(assembler.program().len(), 2);
}
