use anyhow::Context;
use clap::{Parser, Subcommand};
use he_calc::{Calculator, CalculatorConfig, EvaluationResult};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "he-calc", about = "Evaluate arithmetic on encrypted numbers")]
struct Cli {
    /// JSON file with context parameters, zero tolerance and parser limits
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate one expression, e.g. "(2 + 3) * 4"
    Eval { expression: String },
    /// Encrypt two numbers, report ciphertext sizes and add them
    Add {
        #[arg(allow_hyphen_values = true)]
        a: f64,
        #[arg(allow_hyphen_values = true)]
        b: f64,
    },
    /// Read one expression per line from stdin
    Repl,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CalculatorConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CalculatorConfig::default(),
    };
    let calculator = Calculator::new(config);

    let ok = match cli.command {
        Command::Eval { expression } => report(&calculator.evaluate(&expression)),
        Command::Add { a, b } => {
            let outcome = calculator.add(a, b);
            if let Some((left, right)) = outcome.operand_bytes {
                println!("Encrypted {a}: {left} bytes");
                println!("Encrypted {b}: {right} bytes");
            }
            report(&outcome.result)
        }
        Command::Repl => repl(&calculator)?,
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn report(result: &EvaluationResult) -> bool {
    match result {
        EvaluationResult::Success { .. } => println!("{result}"),
        EvaluationResult::Failure { .. } => eprintln!("error: {result}"),
    }
    result.is_success()
}

/// Returns `false` if any line failed.
fn repl(calculator: &Calculator) -> anyhow::Result<bool> {
    let stdin = io::stdin();
    let mut all_ok = true;
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if !line.is_empty() {
            all_ok &= report(&calculator.evaluate(line));
        }
        print!("> ");
        io::stdout().flush()?;
    }
    println!();
    calculator.teardown();
    Ok(all_ok)
}
