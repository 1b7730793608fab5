//! Interactive shell: free text goes to the agent, a few commands are
//! handled locally (load/clear/help/quit).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::{build_analyst, validate_dataset, CliError};

const BANNER: &str = "\
TablePilot — data analyst agent
Type 'help' for commands, 'quit' to exit.";

const HELP: &str = "\
Commands:
  load <path>   switch to another CSV file
  clear         start a fresh conversation
  help          show this help
  quit          exit

Anything else is sent to the agent as a question.";

pub fn cmd_repl(data: Option<PathBuf>, db: Option<PathBuf>) -> Result<(), CliError> {
    let mut dataset = match data {
        Some(path) => {
            validate_dataset(&path)?;
            Some(path.to_string_lossy().to_string())
        }
        None => None,
    };

    let mut agent = build_analyst(db)?;
    let mut thread = new_thread_id();

    println!("{}", BANNER);
    if let Some(path) = &dataset {
        println!("CSV file: {}", path);
    }
    println!();

    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush().map_err(|e| CliError::io(e.to_string()))?;

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => return Err(CliError::io(e.to_string())),
        }
        let input = line.trim();

        match input {
            "" => continue,
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("{}", HELP);
                continue;
            }
            "clear" => {
                thread = new_thread_id();
                println!("Conversation history cleared.");
                continue;
            }
            _ => {}
        }

        if let Some(path) = input.strip_prefix("load ") {
            let path = PathBuf::from(path.trim());
            match validate_dataset(&path) {
                Ok(()) => {
                    dataset = Some(path.to_string_lossy().to_string());
                    println!("CSV file path updated: {}", path.display());
                }
                Err(e) => eprintln!("error: {}", e.message),
            }
            continue;
        }

        let outcome = agent.run(input, dataset.as_deref(), &thread);
        println!("\nAgent: {}", outcome.response);
        if let Some(error) = outcome.error {
            log::warn!("run failed: {}", error);
        }
        println!();
    }

    Ok(())
}

fn new_thread_id() -> String {
    format!("repl-{}", uuid::Uuid::new_v4())
}
