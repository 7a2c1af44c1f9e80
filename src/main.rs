use std::io::Write;

use lstore::{
    Database, EngineConfig,
    shell::{Command, Shell},
};
use rustyline::{DefaultEditor, Result, error::ReadlineError};
use tracing_subscriber::EnvFilter;

const WELCOME: &str = r#"
  _     ____  _
 | |   / ___|| |_ ___  _ __ ___
 | |   \___ \| __/ _ \| '__/ _ \
 | |___ ___) | || (_) | | |  __/
 |_____|____/ \__\___/|_|  \___|
"#;

fn read_multiline_command(rl: &mut DefaultEditor) -> Result<String> {
    let mut input = String::new();
    let mut prompt = "lstore> ".to_string();

    loop {
        let line = rl.readline(&prompt)?;
        let trimmed_line = line.trim_end();

        // Trailing backslash continues the command on the next line
        if let Some(continued) = trimmed_line.strip_suffix('\\') {
            input.push_str(continued);
            input.push(' ');
            prompt = "     -> ".to_string();
        } else {
            input.push_str(trimmed_line);
            break;
        }
    }

    Ok(input)
}

fn process_command(shell: &mut Shell, command: &str) -> bool {
    let cmd = command.trim();

    match cmd.to_lowercase().as_str() {
        "exit" | "quit" | "q" => {
            println!("Goodbye!");
            return false;
        }
        "help" | "h" => {
            println!(
                r#"
Available commands:
  create <table> <columns> <key>   - Create a table and select it
  use <table> | drop <table>       - Select or drop a table
  tables                           - List tables
  insert <v1> <v2> ...             - Insert a full row
  select <key> [<column>]          - Read rows by key (primary key by default)
  version <key> <rel> [<column>]   - Read rows as of <rel> (<= 0) updates ago
  update <key> <v|_> ...           - Update columns, '_' leaves one unchanged
  delete <key>                     - Delete a row by primary key
  sum <begin> <end> <col> [<rel>]  - Sum a column over a primary-key range
  increment <key> <col>            - Add one to a column
  index create|drop <col>          - Manage a column index
  stats, merge                     - Table statistics / compaction hook
  help, h                          - Show this help message
  clear                            - Clear the screen
  exit, quit, q                    - Exit

Use '\' at the end of a line for multiline input.
Use Up/Down arrows to navigate command history.
"#
            );
        }
        "clear" => {
            print!("\x1B[2J\x1B[1;1H");
            let _ = std::io::stdout().flush();
        }
        "" => {}
        _ => match Command::parse(cmd).and_then(|parsed| shell.execute(parsed)) {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{output}"),
            Err(err) => println!("Error: {err}"),
        },
    }

    true
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("{WELCOME}");

    let database = match Database::with_config(EngineConfig::default()) {
        Ok(database) => database,
        Err(err) => {
            eprintln!("Failed to start: {err}");
            std::process::exit(1);
        }
    };
    let mut shell = Shell::new(database);
    let mut rl = DefaultEditor::new()?;

    loop {
        match read_multiline_command(&mut rl) {
            Ok(input) => {
                let command = input.trim().to_string();

                if !command.is_empty() {
                    rl.add_history_entry(&command)?;
                    if !process_command(&mut shell, &command) {
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("EOF");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
