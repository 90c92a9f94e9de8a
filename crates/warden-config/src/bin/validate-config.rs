//! Config validation CLI tool
//!
//! Validates a wardend configuration file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;
use warden_api::DistractionEntry;
use warden_util::default_config_path;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a wardend configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match warden_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", warden_config::CURRENT_CONFIG_VERSION);
            println!("  Socket: {}", settings.daemon.socket_path.display());
            println!("  Policy: {}", settings.daemon.policy_path.display());
            println!("  Tick interval: {:?}", settings.daemon.tick_interval);

            print_entries("Initial blocklist", &settings.initial_policy.blocklist);
            print_entries("Initial whitelist", &settings.initial_policy.whitelist);

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                warden_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                warden_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                warden_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                warden_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        warden_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}

fn print_entries(title: &str, entries: &[DistractionEntry]) {
    if entries.is_empty() {
        return;
    }

    println!();
    println!("{}:", title);
    for entry in entries {
        match &entry.time {
            Some(time) => println!("  - {} [{}]", entry.name, time),
            None => println!("  - {}", entry.name),
        }
    }
}
