//! REPL (Read-Eval-Print Loop)
//!
//! Interactive shell for evaluating expressions. Bindings made with `:let`
//! persist for the session and are visible to later expressions.

use crate::cli::format_value;
use crate::error::format_error;
use crate::evaluator::{Environment, Evaluator};
use crate::token_parser::parse;
use crate::value::Value;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{history::FileHistory, CompletionType, Config, Editor};
use std::env;
use std::path::PathBuf;

/// What a line of input asks for
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Quit,
    Help,
    Clear,
    Env,
    Let { name: &'a str, source: &'a str },
    Eval(&'a str),
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    if !line.starts_with(':') {
        return Command::Eval(line);
    }

    match line {
        ":quit" | ":q" | ":exit" => Command::Quit,
        ":help" | ":h" => Command::Help,
        ":clear" | ":c" => Command::Clear,
        ":env" | ":vars" | ":v" => Command::Env,
        _ => {
            let binding = line
                .strip_prefix(":let ")
                .and_then(|rest| rest.split_once('='))
                .map(|(name, source)| (name.trim(), source.trim()))
                .filter(|(name, source)| !name.is_empty() && !source.is_empty());
            match binding {
                Some((name, source)) => Command::Let { name, source },
                None => Command::Unknown(line),
            }
        }
    }
}

/// Session state: the bindings accumulated with `:let`
#[derive(Default)]
pub struct Session {
    env: Environment,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Evaluate one expression against the session bindings
    pub fn evaluate(&self, source: &str) -> crate::Result<Value> {
        let expr = parse(source)?;
        Evaluator::new(&self.env).evaluate(&expr)
    }

    /// Evaluate `source` and bind the result to `name`
    pub fn define(&mut self, name: &str, source: &str) -> crate::Result<Value> {
        let value = self.evaluate(source)?;
        self.env.insert(name, value.clone());
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.env = Environment::new();
    }
}

/// Run the interactive REPL starting from `env`
pub fn run_repl_with(env: Environment) -> Result<()> {
    println!(
        "{}",
        format!("exprkit REPL v{}", env!("CARGO_PKG_VERSION")).cyan().bold()
    );
    println!("{}", "Type :help for help, :quit to exit".dimmed());
    println!();

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(true)
        .build();

    let mut rl: Editor<(), FileHistory> = Editor::with_config(config)?;

    let history_path = get_history_path();
    if let Some(path) = &history_path {
        let _ = rl.load_history(path); // Missing history is fine
    }

    let mut session = Session { env };
    let mut line_number = 1;
    let mut multiline_buffer = String::new();

    loop {
        let prompt = if multiline_buffer.is_empty() {
            format!("expr:{} ", line_number).green().bold().to_string()
        } else {
            "   ... ".yellow().bold().to_string()
        };

        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                println!("{}", "Use :quit to exit".dimmed());
                multiline_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red().bold(), err);
                break;
            }
        };

        // Lines ending with \ continue on the next line
        let trimmed = line.trim();
        if let Some(partial) = trimmed.strip_suffix('\\') {
            multiline_buffer.push_str(partial);
            multiline_buffer.push(' ');
            continue;
        }
        multiline_buffer.push_str(trimmed);
        let input = std::mem::take(&mut multiline_buffer);
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Command::Quit => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Command::Help => print_help(),
            Command::Clear => {
                session.clear();
                println!("{}", "✓ Bindings cleared".green());
            }
            Command::Env => print_bindings(session.env()),
            Command::Let { name, source } => match session.define(name, source) {
                Ok(value) => {
                    println!("{} = {}", name.green(), format_value(&value));
                    line_number += 1;
                }
                Err(e) => eprint!("{}", format_error(&e, source)),
            },
            Command::Eval(source) => match session.evaluate(source) {
                Ok(value) => {
                    println!("{}", format_value(&value));
                    line_number += 1;
                }
                Err(e) => eprint!("{}", format_error(&e, source)),
            },
            Command::Unknown(command) => {
                eprintln!("{} {}", "Unknown command:".red(), command);
                println!("{}", "Type :help for available commands".dimmed());
            }
        }
    }

    if let Some(path) = history_path {
        let _ = rl.save_history(&path);
    }

    Ok(())
}

/// Get the history file path
fn get_history_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".exprkit_history"))
}

fn print_help() {
    println!("{}", "REPL Commands:".cyan().bold());
    println!("  {}  - Show this help message", ":help, :h".green());
    println!("  {}  - Exit the REPL", ":quit, :q, :exit".green());
    println!("  {}  - Remove all bindings", ":clear, :c".green());
    println!("  {}  - Show all bindings", ":env, :vars".green());
    println!("  {}  - Bind the result of an expression", ":let name = expr".green());
    println!();
    println!("{}", "Examples:".cyan().bold());
    println!("  {}", "min(200, 150)".dimmed());
    println!("  {}", "now() + duration(\"-1m\")".dimmed());
    println!("  {}", ":let self = \":8080\"".dimmed());
    println!("  {}", "split_addr().port > 1024".dimmed());
    println!("  {}", "math.round(2.5) == 3.0".dimmed());
}

fn print_bindings(env: &Environment) {
    if env.is_empty() {
        println!("{}", "No bindings defined".dimmed());
        return;
    }

    println!("{}", "Bindings:".cyan().bold());
    for (name, value) in env.iter() {
        println!("  {} = {}", name.green(), format_value(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(":q"), Command::Quit);
        assert_eq!(parse_command(":env"), Command::Env);
        assert_eq!(
            parse_command(":let port = 8080 + 1"),
            Command::Let {
                name: "port",
                source: "8080 + 1"
            }
        );
        assert_eq!(parse_command(":let = 1"), Command::Unknown(":let = 1"));
        assert_eq!(parse_command(":bogus"), Command::Unknown(":bogus"));
        assert_eq!(parse_command("1 + 1"), Command::Eval("1 + 1"));
    }

    #[test]
    fn test_session_bindings_persist() {
        let mut session = Session::new();
        assert_eq!(session.define("self", r#"":8080""#).unwrap(), Value::from(":8080"));
        assert_eq!(
            session.evaluate("split_addr().port").unwrap(),
            Value::Int(8080)
        );
        session.clear();
        assert!(session.evaluate("self").is_err());
    }
}
