use super::*;

#[test]
fn text_container_loads_and_compiles_to_a_program() {
    let source = "title: Start\n---\n<<set $x to 23>>\nHello\n===\n";
    let program = load_string(SourceFormat::Text, "test.yarn.txt", source).unwrap();
    assert!(program.node_exists("Start"));
    assert_eq!(program.nodes["Start"].instructions.last(), Some(&crate::compiler::Instruction::Stop));
}

#[test]
fn single_node_format_always_titles_the_node_start() {
    let program = load_string(SourceFormat::SingleNodeText, "test.node", "Hello\nWorld").unwrap();
    assert!(program.node_exists("Start"));
}

#[test]
fn duplicate_title_across_nodes_in_one_document_is_rejected() {
    let source = "title: A\n---\nhi\n===\ntitle: A\n---\nbye\n===\n";
    let err = load_string(SourceFormat::Text, "test.yarn.txt", source).unwrap_err();
    assert!(matches!(err, crate::error::YarnError::Compile(crate::error::CompileError::DuplicateNode { .. })));
}

#[test]
fn raw_text_tagged_node_skips_compilation_and_interns_body_verbatim() {
    let source = "title: Credits\ntags: rawText\n---\nline one\nline two\n===\n";
    let program = load_string(SourceFormat::Text, "test.yarn.txt", source).unwrap();
    let node = &program.nodes["Credits"];
    assert!(node.instructions.is_empty());
    let key = node.source_text_string_id.clone().unwrap();
    assert_eq!(program.strings[&key], "line one\nline two");
}

#[test]
fn auto_generated_string_keys_stay_monotonic_across_the_whole_document() {
    let source = "title: A\n---\nFirst\n===\ntitle: B\n---\nSecond\n===\n";
    let program = load_string(SourceFormat::Text, "test.yarn.txt", source).unwrap();
    assert!(program.strings.contains_key("A-0"));
    assert!(program.strings.contains_key("B-1"));
}
