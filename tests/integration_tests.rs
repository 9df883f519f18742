use yarnspin::value::Value;
use yarnspin::{Dialogue, DialogueEvent, EngineConfig};

fn single_node_source(body: &str) -> String {
    format!("title: Start\n---\n{body}\n===\n")
}

fn dialogue_for(body: &str) -> Dialogue {
    let mut dialogue = Dialogue::new();
    dialogue.load_string(&single_node_source(body), "test.yarn.txt").expect("load should succeed");
    dialogue.run("Start").expect("run should succeed");
    dialogue
}

fn next_event(dialogue: &mut Dialogue) -> DialogueEvent {
    dialogue.run_next().expect("run_next should succeed").expect("expected an event, got none")
}

/// Scenario 1: simple assignment + line.
#[test]
fn assignment_then_line_reaches_node_complete_and_persists_the_variable() {
    let mut dialogue = dialogue_for("<<set $x to 23>>\nHello");

    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "Hello".into(), key: "Start-0".into() });
    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: None });
    assert_eq!(dialogue.run_next().unwrap(), None);

    assert_eq!(dialogue.storage().get("x"), Some(Value::Number(23.0)));
}

/// Scenario 2: if/else picks exactly one branch.
#[test]
fn if_else_runs_only_the_taken_branch() {
    let mut dialogue = dialogue_for("<<set $x to 5>>\n<<if $x > 3>>\nA\n<<else>>\nB\n<<endif>>");

    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "A".into(), key: "Start-0".into() });
    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: None });
}

/// Scenario 3: inline (shortcut) options, host selects the second.
#[test]
fn inline_options_resume_at_the_chosen_branch() {
    let mut dialogue = dialogue_for("-> First\n    FirstBody\n-> Second\n    SecondBody");

    let options = match next_event(&mut dialogue) {
        DialogueEvent::OptionSet { options } => options,
        other => panic!("expected OptionSet, got {other:?}"),
    };
    assert_eq!(options.iter().map(|o| o.text.as_str()).collect::<Vec<_>>(), vec!["First", "Second"]);

    dialogue.submit_selection(1).unwrap();
    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "SecondBody".into(), key: "Start-3".into() });
    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: None });
}

/// Scenario 4: a conditioned shortcut option is filtered out of the set.
#[test]
fn options_with_a_false_condition_are_hidden_from_the_option_set() {
    let mut dialogue = dialogue_for("<<set $ok to false>>\n-> Visible\n-> Hidden <<if $ok>>");

    let options = match next_event(&mut dialogue) {
        DialogueEvent::OptionSet { options } => options,
        other => panic!("expected OptionSet, got {other:?}"),
    };
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].text, "Visible");
}

/// Scenario 5: inter-node jump via `[[B]]`.
#[test]
fn jump_option_completes_into_the_next_node() {
    let source = "title: A\n---\n[[B]]\n===\ntitle: B\n---\nWelcome to B\n===\n";
    let mut dialogue = Dialogue::new();
    dialogue.load_string(source, "test.yarn.txt").unwrap();
    dialogue.run("A").unwrap();

    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: Some("B".into()) });
    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "Welcome to B".into(), key: "B-1".into() });
    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: None });
}

/// Scenario 6: an explicit `#line:<id>` pin becomes the string-table key
/// and is recorded in the program's `lineInfo`.
#[test]
fn line_tag_pins_the_localisation_key_and_is_recorded_in_line_info() {
    let mut dialogue = dialogue_for("Hello #line:greet");

    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "Hello".into(), key: "greet".into() });

    assert_eq!(dialogue.program().string("greet"), Some("Hello"));
    let info = dialogue.program().line_info.get("greet").expect("lineInfo entry for pinned key");
    assert_eq!(info.node_name, "Start");
}

/// Boundary: an empty node body compiles to just `Stop`.
#[test]
fn empty_node_body_stops_immediately_with_no_events() {
    let mut dialogue = dialogue_for("");
    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: None });
    assert_eq!(dialogue.run_next().unwrap(), None);
}

/// Boundary: a `rawText`-tagged node never executes; its body is the
/// localisable string referenced by `sourceTextStringID`.
#[test]
fn raw_text_node_interns_its_body_verbatim_and_is_not_runnable() {
    let source = "title: Credits\ntags: rawText\n---\nLine one\nLine two\n===\n";
    let mut dialogue = Dialogue::new();
    dialogue.load_string(source, "test.yarn.txt").unwrap();

    assert_eq!(dialogue.get_text_for_node("Credits"), Some("Line one\nLine two"));
    assert!(dialogue.run("Credits").is_ok());
    // The node has no instructions at all; the VM can't fetch one to run.
    assert!(dialogue.run_next().is_err());
}

/// Boundary: division by zero is IEEE infinity, not a fatal runtime error.
#[test]
fn division_by_zero_yields_ieee_infinity_not_an_error() {
    let mut dialogue = dialogue_for("<<set $x to 1 / 0>>");
    next_event(&mut dialogue);
    assert_eq!(dialogue.storage().get("x"), Some(Value::Number(f32::INFINITY)));
}

/// Boundary: `visitCount` of an unknown node returns 0 rather than erroring.
#[test]
fn visit_count_of_an_unknown_node_is_zero_not_an_error() {
    let mut dialogue = dialogue_for("<<set $n to visitCount(\"Nowhere\")>>");
    next_event(&mut dialogue);
    assert_eq!(dialogue.storage().get("n"), Some(Value::Number(0.0)));
}

/// `visited`/`visited`-adjacent bookkeeping: running a node twice across two
/// separate `run()` calls on the same `Dialogue` accumulates visit count,
/// since only `unload_all(true)` resets it.
#[test]
fn visit_count_survives_across_runs_until_explicitly_cleared() {
    let source = "title: Start\n---\nHello\n===\n";
    let mut dialogue = Dialogue::new();
    dialogue.load_string(source, "test.yarn.txt").unwrap();

    dialogue.run("Start").unwrap();
    next_event(&mut dialogue);
    next_event(&mut dialogue);
    assert_eq!(dialogue.visit_count("Start"), 1);

    dialogue.run("Start").unwrap();
    next_event(&mut dialogue);
    next_event(&mut dialogue);
    assert_eq!(dialogue.visit_count("Start"), 2);

    dialogue.unload_all(true);
    assert_eq!(dialogue.visit_count("Start"), 0);
}

/// Loading two documents with disjoint node sets commutes (spec §8
/// idempotence property), and colliding node names fail symmetrically.
#[test]
fn disjoint_loads_commute_and_colliding_loads_fail_either_order() {
    let a = "title: A\n---\nFrom A\n===\n";
    let b = "title: B\n---\nFrom B\n===\n";

    let mut ab = Dialogue::new();
    ab.load_string(a, "a.yarn.txt").unwrap();
    ab.load_string(b, "b.yarn.txt").unwrap();

    let mut ba = Dialogue::new();
    ba.load_string(b, "b.yarn.txt").unwrap();
    ba.load_string(a, "a.yarn.txt").unwrap();

    assert!(ab.node_exists("A") && ab.node_exists("B"));
    assert!(ba.node_exists("A") && ba.node_exists("B"));

    let dup = "title: A\n---\nAgain\n===\n";
    let mut first = Dialogue::new();
    first.load_string(a, "a.yarn.txt").unwrap();
    assert!(first.load_string(dup, "dup.yarn.txt").is_err());

    let mut second = Dialogue::new();
    second.load_string(dup, "dup.yarn.txt").unwrap();
    assert!(second.load_string(a, "a.yarn.txt").is_err());
}

/// A compiled-container round trip preserves every node and string, modulo
/// `lineInfo` (spec §6: deliberately not serialised).
#[test]
fn compiled_container_round_trip_preserves_nodes_and_strings() {
    use yarnspin::CompiledContainer;

    let source = "title: Start\n---\n<<set $x to 1 + 2>>\nHello #line:greet\n===\n";
    let mut original = Dialogue::new();
    original.load_string(source, "test.yarn.txt").unwrap();

    let json = serde_json::to_vec(&CompiledContainer::from_program(original.program())).unwrap();

    let mut reloaded = Dialogue::new();
    reloaded.load_compiled(&json).unwrap();

    assert_eq!(reloaded.program().nodes, original.program().nodes);
    assert_eq!(reloaded.program().strings, original.program().strings);
    assert!(reloaded.program().line_info.is_empty());
}

/// `shuffleNextOptions` sets the reserved `SHUFFLE_OPTIONS` variable before
/// the next `ShowOptions` suspends for a choice, then resets it once the
/// host's selection lets execution past that point — the host-side
/// presenter reads the flag, between those two moments, to decide whether
/// to randomise display order.
#[test]
fn shuffle_next_options_sets_then_clears_the_reserved_variable() {
    let mut dialogue = dialogue_for("<<shuffleNextOptions>>\n-> First\n    A\n-> Second\n    B");

    assert!(matches!(next_event(&mut dialogue), DialogueEvent::OptionSet { .. }));
    assert_eq!(dialogue.storage().get("SHUFFLE_OPTIONS"), Some(Value::Bool(true)));

    dialogue.submit_selection(0).unwrap();
    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "A".into(), key: "Start-2".into() });
    assert_eq!(dialogue.storage().get("SHUFFLE_OPTIONS"), Some(Value::Bool(false)));
}

/// A `<<stop>>` command ends the node without a trailing `RunNode`.
#[test]
fn stop_command_ends_the_node_without_a_run_node() {
    let mut dialogue = dialogue_for("Hello\n<<stop>>\nUnreachable");
    next_event(&mut dialogue);
    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: None });
}

/// A custom command with no matching special case surfaces verbatim as a
/// `Command` event for the host to interpret.
#[test]
fn unrecognised_custom_command_surfaces_as_a_command_event() {
    let mut dialogue = dialogue_for("<<wave leftArm>>");
    assert_eq!(next_event(&mut dialogue), DialogueEvent::Command { text: "wave leftArm".into() });
    assert_eq!(next_event(&mut dialogue), DialogueEvent::NodeComplete { next_node: None });
}

/// `.json`-format loading, exercising the loader's format dispatch.
#[test]
fn json_container_loads_and_runs_like_the_text_format() {
    let json = r#"[{"title": "Start", "body": ["Hi from JSON"], "tags": []}]"#;
    let mut dialogue = Dialogue::new();
    dialogue.load_string(json, "story.json").unwrap();
    dialogue.run("Start").unwrap();
    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "Hi from JSON".into(), key: "Start-0".into() });
}

/// A missing node in `RunNode` is a fatal runtime error that stops the VM.
#[test]
fn jump_to_a_missing_node_is_a_fatal_runtime_error() {
    let mut dialogue = dialogue_for("[[Nowhere]]");
    assert!(dialogue.run_next().is_err());
}

/// `submit_selection` out of range is rejected rather than silently
/// clamped or ignored.
#[test]
fn submitting_an_out_of_range_selection_is_rejected() {
    let mut dialogue = dialogue_for("-> First\n    A\n-> Second\n    B");
    next_event(&mut dialogue);
    assert!(dialogue.submit_selection(5).is_err());
}

/// Under the default (legacy) config, `$x == 0` is true for an unset
/// variable, since an unset `$x` reads back as `Null` (Design Notes §9).
/// Switching to `EngineConfig::strict()` drops that quirk.
#[test]
fn engine_config_strict_mode_disables_the_null_equals_zero_quirk() {
    let mut legacy = dialogue_for("<<if $unset == 0>>\nEqual\n<<else>>\nNotEqual\n<<endif>>");
    assert_eq!(next_event(&mut legacy), DialogueEvent::Line { text: "Equal".into(), key: "Start-0".into() });

    let mut dialogue = Dialogue::new();
    dialogue.set_config(EngineConfig::strict());
    dialogue.load_string(&single_node_source("<<if $unset == 0>>\nEqual\n<<else>>\nNotEqual\n<<endif>>"), "test.yarn.txt").unwrap();
    dialogue.run("Start").unwrap();
    assert_eq!(next_event(&mut dialogue), DialogueEvent::Line { text: "NotEqual".into(), key: "Start-1".into() });
}

/// `library_mut` registers directly into the table the VM calls through,
/// so a host-registered function is callable from a script in the same
/// session that registered it.
#[test]
fn host_registered_function_is_callable_from_the_script_that_registered_it() {
    let mut dialogue = Dialogue::new();
    dialogue.library_mut().register("double", 1, true, |args| Ok(Value::Number(args[0].as_number() * 2.0)));
    dialogue.load_string(&single_node_source("<<set $x to double(21)>>"), "test.yarn.txt").unwrap();
    dialogue.run("Start").unwrap();
    next_event(&mut dialogue);
    assert_eq!(dialogue.storage().get("x"), Some(Value::Number(42.0)));
}
