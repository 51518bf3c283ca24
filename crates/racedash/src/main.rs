//! `racedash` - CLI for the race telemetry service
//!
//! This binary runs the HTTP server and offers offline helpers for checking
//! race-data files and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use racedash::cli::{Cli, Command, ConfigCommand, ServeCommand, ValidateCommand};
use racedash::summary::DocumentSummary;
use racedash::{init_logging, server, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Configuration is loaded by the commands that need it
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(cli.config, serve_cmd).await,
        Command::Validate(validate_cmd) => handle_validate(&validate_cmd),
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    Config::load_from(path).context("loading configuration")
}

async fn handle_serve(config_path: Option<PathBuf>, cmd: ServeCommand) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(bind) = cmd.bind {
        config.server.bind_addr = bind;
    }

    server::serve(&config, AppState::in_memory())
        .await
        .context("running HTTP server")
}

fn handle_validate(cmd: &ValidateCommand) -> Result<()> {
    let document = racedash::load_document(&cmd.file).map_err(|e| {
        let context = if e.is_validation_error() {
            format!("{} is not valid race data", cmd.file.display())
        } else {
            format!("reading {}", cmd.file.display())
        };
        anyhow::Error::new(e).context(context)
    })?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let summary = DocumentSummary::from_document(&document);
    println!("{} is valid race data", cmd.file.display());
    println!();
    println!("Driver:        {}", summary.driver_name);
    println!("Location:      {}", document.profile_info.location);
    println!("Total races:   {}", document.profile_info.total_races);
    println!("Races in file: {}", summary.races.len());
    println!("Laps in file:  {}", summary.total_laps());
    println!("Digest:        {}", document.digest());

    for race in &summary.races {
        println!();
        println!("[{}] {}, position {}", race.race_id, race.track, race.position);
        println!("  Laps:        {}", race.lap_count);
        match &race.fastest_lap {
            Some(lap) => println!("  Fastest lap: {} {}", lap.label, lap.formatted),
            None => println!("  Fastest lap: -"),
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.server.bind_addr);
                println!("  Max upload bytes:   {}", config.server.max_upload_bytes);
                println!();
                println!("[CORS]");
                println!("  Enabled:            {}", config.cors.enabled);
                println!(
                    "  Allowed origins:    {}",
                    config.cors.allowed_origins.join(", ")
                );
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            if let Err(e) = Config::load_from(Some(path)) {
                println!("Configuration error: {e}");
                return Err(e.into());
            }
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
