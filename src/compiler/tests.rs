use super::*;
use crate::lexer::tokenize;
use crate::parser::{ast::Node, parse};

fn compile_body(name: &str, body: &[&str]) -> Program {
    let body: Vec<String> = body.iter().map(|s| s.to_string()).collect();
    let lexed = tokenize(name, &body);
    assert!(lexed.errors.is_empty(), "lex errors: {:?}", lexed.errors);
    let parsed = parse(name, &lexed.tokens);
    assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
    let node = Node { name: name.to_string(), tags: vec![], source: None, statements: parsed.statements };
    compile(&[node]).expect("compile should succeed")
}

#[test]
fn assignment_then_line_ends_with_stop() {
    let program = compile_body("Start", &["<<set $x to 23>>", "Hello"]);
    let node = &program.nodes["Start"];
    assert_eq!(node.instructions.last(), Some(&Instruction::Stop));
    assert!(node.instructions.contains(&Instruction::PushNumber(23.0)));
    assert!(node.instructions.contains(&Instruction::StoreVariable("x".into())));
    let line_key = node
        .instructions
        .iter()
        .find_map(|i| match i {
            Instruction::RunLine(k) => Some(k.clone()),
            _ => None,
        })
        .expect("RunLine instruction");
    assert_eq!(program.strings[&line_key], "Hello");
}

#[test]
fn if_else_clause_balances_the_stack_on_both_paths() {
    let program = compile_body("Start", &["<<if $x > 3>>", "A", "<<else>>", "B", "<<endif>>"]);
    let node = &program.nodes["Start"];
    let pop_count = node.instructions.iter().filter(|i| matches!(i, Instruction::Pop)).count();
    // one Pop after JumpIfFalse (true path) + one at clauseEnd (false path).
    assert_eq!(pop_count, 2);
    assert!(matches!(node.instructions[1], Instruction::JumpIfFalse(_)));
}

#[test]
fn inline_shortcut_options_group_is_self_contained_and_node_ends_in_stop() {
    let program = compile_body("Start", &["-> First", "    FirstBody", "-> Second", "    SecondBody"]);
    let node = &program.nodes["Start"];
    assert_eq!(node.instructions.last(), Some(&Instruction::Stop));
    assert_eq!(node.instructions.iter().filter(|i| matches!(i, Instruction::AddOption { .. })).count(), 2);
    assert!(node.instructions.contains(&Instruction::ShowOptions));
    assert!(node.instructions.contains(&Instruction::Jump));
}

#[test]
fn bare_destination_option_emits_direct_run_node() {
    let program = compile_body("Start", &["[[North]]"]);
    let node = &program.nodes["Start"];
    let key = match &node.instructions[0] {
        Instruction::PushString(key) => key.clone(),
        other => panic!("expected PushString, got {other:?}"),
    };
    assert_eq!(program.strings[&key], "North");
    assert_eq!(node.instructions[1], Instruction::RunNode);
}

#[test]
fn dangling_labelled_option_is_closed_with_show_options_and_run_node() {
    let program = compile_body("Start", &["[[Go north|North]]"]);
    let node = &program.nodes["Start"];
    assert!(matches!(node.instructions[0], Instruction::AddOption { .. }));
    assert_eq!(node.instructions[1], Instruction::ShowOptions);
    assert_eq!(node.instructions[2], Instruction::RunNode);
}

#[test]
fn every_jump_resolves_to_an_index_present_in_the_node() {
    let program = compile_body("Start", &["<<if $x == 1>>", "A", "<<elseif $x == 2>>", "B", "<<else>>", "C", "<<endif>>"]);
    let node = &program.nodes["Start"];
    for instr in &node.instructions {
        match instr {
            Instruction::JumpTo(idx) | Instruction::JumpIfFalse(idx) => assert!(*idx < node.instructions.len()),
            _ => {}
        }
    }
}

#[test]
fn library_call_pushes_argument_count_before_call_func() {
    let program = compile_body("Start", &["<<if visited(\"Start\")>>", "A", "<<endif>>"]);
    let node = &program.nodes["Start"];
    let call_idx = node.instructions.iter().position(|i| matches!(i, Instruction::CallFunc(name) if name == "visited")).unwrap();
    assert_eq!(node.instructions[call_idx - 1], Instruction::PushNumber(1.0));
}

#[test]
fn duplicate_explicit_line_key_aborts_the_compile() {
    let body: Vec<String> = vec!["A #line:dup".into(), "B #line:dup".into()];
    let lexed = tokenize("Start", &body);
    let parsed = parse("Start", &lexed.tokens);
    let node = Node { name: "Start".into(), tags: vec![], source: None, statements: parsed.statements };
    let err = compile(&[node]).unwrap_err();
    assert_eq!(err, crate::error::CompileError::DuplicateStringKey { node: "Start".into(), key: "dup".into() });
}

#[test]
fn rawtext_tagged_node_compiles_to_no_instructions() {
    let node = Node { name: "Credits".into(), tags: vec!["rawText".into()], source: Some("line one\nline two".into()), statements: vec![] };
    let program = compile(&[node]).unwrap();
    let node = &program.nodes["Credits"];
    assert!(node.instructions.is_empty());
    let key = node.source_text_string_id.clone().unwrap();
    assert_eq!(program.strings[&key], "line one\nline two");
}

#[test]
fn empty_body_compiles_to_stop_only() {
    let node = Node { name: "Start".into(), tags: vec![], source: None, statements: vec![] };
    let program = compile(&[node]).unwrap();
    assert_eq!(program.nodes["Start"].instructions, vec![Instruction::Stop]);
}

#[test]
fn duplicate_node_name_across_the_set_is_rejected() {
    let a = Node { name: "Start".into(), tags: vec![], source: None, statements: vec![] };
    let b = Node { name: "Start".into(), tags: vec![], source: None, statements: vec![] };
    let err = compile(&[a, b]).unwrap_err();
    assert_eq!(err, crate::error::CompileError::DuplicateNode { name: "Start".into() });
}

#[test]
fn shuffle_next_options_command_resets_after_the_next_show_options() {
    let program = compile_body("Start", &["<<shuffleNextOptions>>", "-> A", "-> B"]);
    let node = &program.nodes["Start"];
    let show_idx = node.instructions.iter().position(|i| matches!(i, Instruction::ShowOptions)).unwrap();
    assert_eq!(node.instructions[show_idx + 1], Instruction::PushBool(false));
    assert_eq!(node.instructions[show_idx + 2], Instruction::StoreVariable("SHUFFLE_OPTIONS".into()));
}
