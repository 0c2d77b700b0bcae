use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use hotkey_scopes::combo::{is_input_conflict, normalize_combo, Chord};
use hotkey_scopes::config::{self, HotkeyConfig};
use hotkey_scopes::logging;
use hotkey_scopes::scenario::Scenario;

#[derive(Parser)]
#[command(name = "hotkey-scopes")]
#[command(about = "Run and inspect scoped hotkey scenarios")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Path to JSON config file (defaults to ~/.config/hotkey-scopes/config.json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and print the dispatch report
    Run {
        /// Scenario JSON file
        scenario: PathBuf,
    },

    /// Check a scenario's scope hierarchy without playing its steps
    Validate {
        /// Scenario JSON file
        scenario: PathBuf,
    },

    /// Show how combos are normalized and displayed
    Normalize {
        /// Combos such as "$mod+Shift+K"
        #[arg(required = true)]
        combos: Vec<String>,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NormalizedCombo {
    input: String,
    normalized: String,
    display: Option<String>,
    input_conflict: bool,
    error: Option<String>,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HotkeyConfig> {
    match path {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(config::load_config()),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", output);
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { scenario } => {
            let loaded = Scenario::load(&scenario)?;
            let report = loaded
                .run(config)
                .with_context(|| format!("running scenario {}", scenario.display()))?;
            print_json(&report, cli.pretty)?;
            Ok(report.validation_errors.is_empty())
        }
        Commands::Validate { scenario } => {
            let mut loaded = Scenario::load(&scenario)?;
            loaded.steps.clear();
            let report = loaded.run(config)?;
            print_json(&report.validation_errors, cli.pretty)?;
            Ok(report.validation_errors.is_empty())
        }
        Commands::Normalize { combos } => {
            let rows: Vec<NormalizedCombo> = combos
                .into_iter()
                .map(|input| {
                    let normalized = normalize_combo(&input);
                    let parsed = Chord::parse(&input);
                    NormalizedCombo {
                        input_conflict: is_input_conflict(&normalized),
                        display: parsed.as_ref().ok().map(Chord::display),
                        error: parsed.err().map(|e| e.to_string()),
                        normalized,
                        input,
                    }
                })
                .collect();
            print_json(&rows, cli.pretty)?;
            Ok(true)
        }
        Commands::ShowConfig => {
            print_json(&config, cli.pretty)?;
            Ok(true)
        }
    }
}

fn main() {
    let _guard = logging::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
