use std::env;
use std::io::{self, BufRead, Write};

use yarnspin::{Dialogue, DialogueEvent};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: yarnspin <file.yarn.txt|file.json|file.node> [start-node]");
        std::process::exit(1);
    }

    let start_node = args.get(2).map(String::as_str).unwrap_or("Start");

    let mut dialogue = Dialogue::new();
    if let Err(err) = dialogue.load_file(&args[1]) {
        eprintln!("load error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = dialogue.run(start_node) {
        eprintln!("runtime error: {err}");
        std::process::exit(1);
    }

    let stdin = io::stdin();
    loop {
        match dialogue.run_next() {
            Ok(None) => break,
            Ok(Some(DialogueEvent::Line { text, .. })) => println!("{text}"),
            Ok(Some(DialogueEvent::Command { text })) => println!("<<{text}>>"),
            Ok(Some(DialogueEvent::OptionSet { options })) => {
                for (i, option) in options.iter().enumerate() {
                    println!("  {}) {}", i + 1, option.text);
                }
                print!("> ");
                io::stdout().flush().ok();

                let mut line = String::new();
                if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let choice: usize = line.trim().parse().unwrap_or(1);
                let index = choice.saturating_sub(1);
                if let Err(err) = dialogue.submit_selection(index) {
                    eprintln!("selection error: {err}");
                    break;
                }
            }
            Ok(Some(DialogueEvent::NodeComplete { next_node: None })) => break,
            Ok(Some(DialogueEvent::NodeComplete { .. })) => {}
            Err(err) => {
                eprintln!("runtime error: {err}");
                break;
            }
        }
    }
}
