// src/main.rs
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use liveeval::config::{AppConfig, SupersedePolicy};
use liveeval::errors::{EvalError, Result};
use liveeval::language::Language;
use liveeval::output::{render_plain, Outcome};
use liveeval::{banner, Coordinator, EvaluationResult, HttpEvaluator};

/// Live evaluation client: sends your code to an evaluation service as you edit it.
#[derive(Parser, Debug)]
#[command(name = "liveeval", version)]
struct Cli {
    /// Base URL of the evaluation service, e.g. http://127.0.0.1:8000/api
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// What to do with an in-flight request when the file changes again
    #[arg(long, global = true, value_name = "cancel|finish")]
    supersede: Option<SupersedePolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate FILE every time it changes
    Watch {
        file: PathBuf,
        /// Language identifier; inferred from the extension if omitted
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Evaluate FILE once and exit with its return code
    Run {
        file: PathBuf,
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Show the last submission the service has seen
    Restore {
        /// Write the restored code to this file instead of printing it
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    if let Err(e) = dotenv {
        log::debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(api_base) = cli.api_base {
        config.service.api_base = api_base;
    }
    if let Some(policy) = cli.supersede {
        config.coordinator.supersede = policy;
    }

    let evaluator = HttpEvaluator::new(reqwest::Client::new(), config.service.clone());
    let api_base = evaluator.config().api_base.clone();
    let coordinator = Coordinator::spawn(evaluator, config.coordinator);

    match cli.command {
        Command::Watch { file, language } => {
            let language = resolve_language(&file, language)?;
            banner::print_banner(&api_base);
            watch(&coordinator, &file, &language, config.watch.poll_interval()).await
        }
        Command::Run { file, language } => {
            let language = resolve_language(&file, language)?;
            let code = tokio::fs::read_to_string(&file).await?;
            let result = coordinator.submit(code, language).await;
            coordinator.shutdown().await;
            match result {
                Some(result) => {
                    print_result(&result);
                    Ok(ExitCode::from(result.return_code.clamp(0, 255) as u8))
                }
                None => Err(EvalError::Closed),
            }
        }
        Command::Restore { write } => {
            match coordinator.fetch_last_code().await {
                Some(last) => match write {
                    Some(path) => {
                        tokio::fs::write(&path, &last.code).await?;
                        println!("✅ Restored {} code to {}", last.language, path.display());
                    }
                    None => {
                        println!("// language: {}", last.language);
                        println!("{}", last.code);
                    }
                },
                None => println!("ℹ️  No previous submission"),
            }
            coordinator.shutdown().await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_language(file: &Path, explicit: Option<String>) -> Result<String> {
    if let Some(language) = explicit {
        if language.parse::<Language>().is_err() {
            log::warn!("'{}' is not a known language, sending it anyway", language);
        }
        return Ok(language);
    }
    Language::from_path(file)
        .map(|language| language.as_str().to_string())
        .ok_or_else(|| {
            EvalError::Config(format!(
                "cannot infer a language for {}, pass --language",
                file.display()
            ))
        })
}

async fn watch(
    coordinator: &Coordinator<HttpEvaluator>,
    file: &Path,
    language: &str,
    poll: Duration,
) -> Result<ExitCode> {
    println!("👀 Watching {} as {} (Ctrl+C to stop)", file.display(), language);

    let mut results = coordinator.results();
    let mut last_code: Option<String> = None;
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => match tokio::fs::read_to_string(file).await {
                Ok(code) if last_code.as_deref() != Some(code.as_str()) => {
                    log::debug!("{} changed, submitting", file.display());
                    // Results arrive on the watch channel; the ticket is not needed.
                    let _ = coordinator.submit(code.clone(), language);
                    last_code = Some(code);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Failed to read {}: {}", file.display(), e),
            },
            changed = results.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = results.borrow_and_update().clone();
                if let Some(result) = latest.filter(|r| coordinator.is_current(r)) {
                    print_result(&result);
                }
            }
        }
    }

    coordinator.shutdown().await;
    println!("\n👋 Stopped watching");
    Ok(ExitCode::SUCCESS)
}

fn print_result(result: &EvaluationResult) {
    let separator = "=".repeat(60);
    let icon = match Outcome::of(result) {
        Outcome::Success => "✅",
        Outcome::Failure => "❌",
        Outcome::Empty => "ℹ️ ",
    };
    println!("\n{}", separator);
    println!(
        "{} {} (exit {}) · #{} · {}ms · {}",
        icon,
        Outcome::of(result),
        result.return_code,
        result.sequence,
        result.latency_ms,
        result.received_at.format("%H:%M:%S")
    );
    println!("{}", separator);
    print!("{}", render_plain(result));
}
