//! exprkit CLI - evaluate, inspect and check expressions from the shell

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use exprkit::cli::{self, format_value, split_binding};
use exprkit::error::format_error;
use exprkit::{functions, packages, Environment, Evaluator, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exprkit")]
#[command(about = "Evaluate configuration expressions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pin now() to 2020-01-01T00:00:00Z
    #[arg(long, global = true)]
    test_mode: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression and print the result
    Eval {
        /// Expression source
        expr: String,

        #[command(flatten)]
        bindings: BindingArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Parse an expression and print its syntax tree
    Parse {
        /// Expression source
        expr: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Succeed only if the expression evaluates to true
    Check {
        /// Expression source
        expr: String,

        #[command(flatten)]
        bindings: BindingArgs,
    },

    /// List builtin functions and package members
    Functions,

    /// Start interactive REPL (Read-Eval-Print Loop)
    Repl {
        #[command(flatten)]
        bindings: BindingArgs,
    },
}

#[derive(Args)]
struct BindingArgs {
    /// Bind NAME to the value of an expression (NAME=EXPR)
    #[arg(short, long = "bind", value_name = "NAME=EXPR")]
    bind: Vec<String>,

    /// Bind NAME to a literal string (NAME=VALUE)
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Load bindings from a JSON object
    #[arg(long, value_name = "FILE")]
    vars: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.test_mode {
        exprkit::enable_test_mode();
    }

    match cli.command {
        Commands::Eval {
            expr,
            bindings,
            format,
        } => {
            let env = build_environment(&bindings)?;
            let value = evaluate_or_exit(&expr, &env);
            print_value(&value, format)?;
        }

        Commands::Parse { expr, format } => {
            let ast = match exprkit::parse(&expr) {
                Ok(ast) => ast,
                Err(e) => {
                    eprint!("{}", format_error(&e, &expr));
                    std::process::exit(1);
                }
            };
            match format {
                OutputFormat::Text => println!("{:#?}", ast),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ast)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&ast)?),
            }
        }

        Commands::Check { expr, bindings } => {
            let env = build_environment(&bindings)?;
            match evaluate_or_exit(&expr, &env) {
                Value::Bool(true) => cli::success(&format!("{} holds", expr)),
                Value::Bool(false) => {
                    cli::error(&format!("{} does not hold", expr));
                    std::process::exit(1);
                }
                other => {
                    cli::error(&format!(
                        "{} evaluated to {} ({}), expected bool",
                        expr,
                        format_value(&other),
                        other.type_name()
                    ));
                    std::process::exit(1);
                }
            }
        }

        Commands::Functions => print_functions(),

        Commands::Repl { bindings } => {
            let env = build_environment(&bindings)?;
            exprkit::repl::run_repl_with(env)?;
        }
    }

    Ok(())
}

/// Collect bindings from `--vars`, then `--set`, then `--bind`; later ones win
fn build_environment(args: &BindingArgs) -> Result<Environment> {
    let mut env = match &args.vars {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read vars file: {}", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse vars file: {}", path.display()))?;
            Environment::from_json(&json)
                .with_context(|| format!("Invalid vars file: {}", path.display()))?
        }
        None => Environment::new(),
    };

    for binding in &args.set {
        let (name, value) = split_binding(binding)
            .ok_or_else(|| anyhow!("Invalid binding {:?}: expected NAME=VALUE", binding))?;
        env.insert(name, value);
    }

    for binding in &args.bind {
        let (name, source) = split_binding(binding)
            .ok_or_else(|| anyhow!("Invalid binding {:?}: expected NAME=EXPR", binding))?;
        let expr = exprkit::parse(source).with_context(|| format!("Failed to parse binding {}", name))?;
        let value = Evaluator::new(&env)
            .evaluate(&expr)
            .with_context(|| format!("Failed to evaluate binding {}", name))?;
        tracing::debug!(name, "bound from expression");
        env.insert(name, value);
    }

    Ok(env)
}

fn evaluate_or_exit(source: &str, env: &Environment) -> Value {
    let result = exprkit::parse(source).and_then(|expr| Evaluator::new(env).evaluate(&expr));
    match result {
        Ok(value) => value,
        Err(e) => {
            eprint!("{}", format_error(&e, source));
            std::process::exit(1);
        }
    }
}

fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", format_value(value)),
        OutputFormat::Json => {
            let json = value.to_json().context("Result has no JSON form")?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Yaml => {
            let json = value.to_json().context("Result has no YAML form")?;
            print!("{}", serde_yaml::to_string(&json)?);
        }
    }
    Ok(())
}

fn print_functions() {
    println!("{}", "Builtins:".bold());
    for name in functions::registry().list_functions() {
        if let Some(Value::Function(f)) = functions::lookup(&name) {
            let marker = if f.accepts_implicit_self() { " (self)" } else { "" };
            println!("  {}{}", f.signature().cyan(), marker.dimmed());
        }
    }

    for namespace in packages::package_names() {
        let Some(package) = packages::package(namespace) else {
            continue;
        };
        println!();
        println!("{}", format!("{}:", package.name()).bold());
        for (member, value) in package.members() {
            match value {
                Value::Function(f) => println!("  {}", f.signature().cyan()),
                other => println!(
                    "  {}.{} = {}",
                    namespace,
                    member.cyan(),
                    format_value(other)
                ),
            }
        }
    }
}
