//! Interactive line-mode stepper for the yarnspin virtual machine.
//!
//! Loads a dialogue container, then lets the operator single-step
//! instructions, inspect the operand stack and variable storage, or run
//! to the next host-visible event — a plain stdin/stdout loop rather than
//! a TUI, since there was no behavioural payoff in a full screen debugger
//! for an event-driven dialogue VM (see DESIGN.md's dropped-dependency
//! note on `ratatui`/`crossterm`).

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, RwLock};

use yarnspin::storage::MemoryVariableStorage;
use yarnspin::{DialogueEvent, Library, Program, VirtualMachine, VmState};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: yarnspin-repl <file.yarn.txt|file.json|file.node> [start-node]");
        std::process::exit(1);
    }

    let path = &args[1];
    let start_node = args.get(2).map(String::as_str).unwrap_or("Start");

    let source = fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("failed to read {path}: {err}");
        std::process::exit(1);
    });

    let program: Program = match yarnspin::loader::load_string(yarnspin::loader::detect_format(path), path, &source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("load error: {err}");
            std::process::exit(1);
        }
    };

    let mut vm = VirtualMachine::new(Arc::new(program), Arc::new(RwLock::new(Library::new())), Box::new(MemoryVariableStorage::new()));
    if let Err(err) = vm.run(start_node) {
        eprintln!("runtime error: {err}");
        std::process::exit(1);
    }

    print_help();
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print_prompt(&vm);
        line.clear();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let command = line.trim();
        match command {
            "" | "s" | "step" => step(&mut vm),
            "r" | "run" => run_to_event(&mut vm),
            "stack" => print_stack(&vm),
            "vars" => print_vars(&vm),
            "q" | "quit" | "exit" => break,
            "h" | "help" => print_help(),
            other if other.starts_with("select ") || other.starts_with("choose ") => {
                let arg = other.split_whitespace().nth(1).unwrap_or("");
                match arg.parse::<usize>() {
                    Ok(index) => match vm.submit_selection(index.saturating_sub(1)) {
                        Ok(()) => println!("selected option {index}"),
                        Err(err) => println!("error: {err}"),
                    },
                    Err(_) => println!("usage: select <1-based index>"),
                }
            }
            other => println!("unrecognised command: {other:?} (type 'help')"),
        }

        if vm.state() == VmState::Stopped {
            println!("-- VM stopped --");
            break;
        }
    }
}

fn print_help() {
    println!("commands: step (s), run (r), stack, vars, select <n>, quit (q)");
}

fn print_prompt(vm: &VirtualMachine) {
    let instruction = vm.peek_instruction().map(|i| format!("{i:?}")).unwrap_or_else(|| "<end of node>".to_string());
    print!("[{}@{}] {} > ", vm.current_node(), vm.pc(), instruction);
    io::stdout().flush().ok();
}

fn step(vm: &mut VirtualMachine) {
    match vm.step() {
        Ok(Some(event)) => print_event(&event),
        Ok(None) => {}
        Err(err) => println!("error: {err}"),
    }
}

fn run_to_event(vm: &mut VirtualMachine) {
    match vm.run_next() {
        Ok(Some(event)) => print_event(&event),
        Ok(None) => println!("-- no more events --"),
        Err(err) => println!("error: {err}"),
    }
}

fn print_event(event: &DialogueEvent) {
    match event {
        DialogueEvent::Line { text, key } => println!("LINE [{key}] {text}"),
        DialogueEvent::Command { text } => println!("COMMAND <<{text}>>"),
        DialogueEvent::OptionSet { options } => {
            println!("OPTIONS:");
            for (i, option) in options.iter().enumerate() {
                println!("  {}) {} -> {}", i + 1, option.text, option.destination);
            }
        }
        DialogueEvent::NodeComplete { next_node } => match next_node {
            Some(next) => println!("NODE COMPLETE -> {next}"),
            None => println!("NODE COMPLETE (stop)"),
        },
    }
}

fn print_stack(vm: &VirtualMachine) {
    if vm.stack_values().is_empty() {
        println!("(empty stack)");
        return;
    }
    for (i, value) in vm.stack_values().iter().enumerate() {
        println!("  [{i}] {value:?}");
    }
}

fn print_vars(vm: &VirtualMachine) {
    let snapshot = vm.storage().snapshot();
    if snapshot.is_empty() {
        println!("(no variables set)");
        return;
    }
    for (name, value) in snapshot {
        println!("  ${name} = {}", value.as_string());
    }
}
