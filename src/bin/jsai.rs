//! CLI wrapper for the jsai analyzer.
//!
//! Usage:
//!   jsai <file.js>                    # Analyze a JavaScript file
//!   jsai -e "code"                    # Analyze JavaScript code
//!   jsai --config jsai.toml <file.js> # Use an explicit configuration file

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use jsai::runner::api::{AnalysisOutcome, Analyzer};
use jsai::runner::plugin::config::AnalysisConfig;

fn main() {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path = None;
    if args.len() >= 2 && (args[0] == "-c" || args[0] == "--config") {
        config_path = Some(args.remove(1));
        args.remove(0);
    }
    let config = AnalysisConfig::load_or_default(config_path.as_deref().map(Path::new));
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let source = match args.as_slice() {
        [flag] if flag == "-h" || flag == "--help" => {
            print_usage();
            process::exit(0);
        }
        [flag, code] if flag == "-e" || flag == "--eval" => code.clone(),
        [file] => match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", file, e);
                process::exit(1);
            }
        },
        _ => {
            print_usage();
            process::exit(1);
        }
    };

    let analyzer = match Analyzer::new(config) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };
    match analyzer.analyze(&source) {
        Ok(outcome) => print_outcome(&analyzer, &outcome),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("jsai - abstract interpreter for JavaScript");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  jsai [--config <file.toml>] <file.js>     Analyze a JavaScript file");
    eprintln!("  jsai [--config <file.toml>] -e \"code\"     Analyze JavaScript code");
    eprintln!();
    eprintln!("RUST_LOG overrides the log_filter configuration key.");
}

fn print_outcome(analyzer: &Analyzer, outcome: &AnalysisOutcome) {
    println!("value: {}", outcome.value);
    let registry = &analyzer.runtime().registry;
    let mut globals: Vec<_> = outcome
        .globals
        .iter()
        .filter(|(name, value)| registry.global(name) != Some(*value))
        .collect();
    globals.sort_by(|a, b| a.0.cmp(b.0));
    println!("globals:");
    for (name, value) in globals {
        println!("  {} = {}", name, value);
    }
    for annotation in &outcome.annotations {
        println!("{} payload:", annotation.kind);
        println!("{}", annotation.source);
    }
}
