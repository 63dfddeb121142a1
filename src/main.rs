mod cli;
mod execute;

use clap::Parser;
use colored::Colorize;
use goenv::{Config, GoenvError};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use crate::cli::CLI;

fn main() {
    let cli = CLI::parse();
    let config = Config::from_env();
    init_logging(config.debug);

    match execute::execute(cli, &config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            if let Some(GoenvError::CommandNotFound { command, candidates }) = e.downcast_ref::<GoenvError>() {
                if !candidates.is_empty() {
                    eprintln!();
                    eprintln!("The '{command}' command exists in these Go versions:");
                    for version in candidates {
                        eprintln!("  {version}");
                    }
                }
            }
            std::process::exit(1);
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Warn };
    let log_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    let _ = TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto);
}
