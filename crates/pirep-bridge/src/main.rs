//! `pxp` - X-Plane to phpVMS ACARS bridge
//!
//! This binary runs the telemetry bridge and offers a few one-shot commands
//! for browsing the airline's catalog and managing local settings.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pirep_bridge::catalog::{self, CatalogItem};
use pirep_bridge::cli::{
    Cli, Command, ConfigCommand, ListCommand, OfpCommand, PirepsCommand, PrefsCommand, RunCommand,
};
use pirep_bridge::console::Console;
use pirep_bridge::logging::Verbosity;
use pirep_bridge::{
    init_logging, Config, DatagramListener, FlightService, HttpReportClient, Preferences,
};

type Service = FlightService<HttpReportClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    let prefs_path = cli
        .prefs
        .clone()
        .unwrap_or_else(Config::default_preferences_path);

    // These work without a valid configuration
    match cli.command {
        Command::Config(cmd) => {
            init_logging(verbosity.unwrap_or_default());
            return handle_config(cli.config, cmd);
        }
        Command::Prefs(cmd) => {
            init_logging(verbosity.unwrap_or_default());
            return handle_prefs(&prefs_path, cmd);
        }
        _ => {}
    }

    let mut config =
        Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    let preferences = Preferences::load(&prefs_path)
        .with_context(|| format!("failed to read {}", prefs_path.display()))?;
    config.apply_preferences(&preferences);

    init_logging(
        verbosity
            .or_else(|| config.verbosity())
            .unwrap_or(Verbosity::Normal),
    );

    let client = HttpReportClient::new(
        config.phpvms.base_url.clone(),
        config.phpvms.api_key.clone(),
        config.simbrief.fetch_url.clone(),
        config.http_timeout(),
    )?;
    let service = Arc::new(FlightService::new(client));

    match cli.command {
        Command::Run(cmd) => handle_run(config, service, prefs_path, &cmd).await,
        Command::Airlines(cmd) => handle_airlines(&service, &cmd).await,
        Command::Fleet(cmd) => handle_fleet(&service, &cmd).await,
        Command::Pireps(cmd) => handle_pireps(&service, &cmd).await,
        Command::Ofp(cmd) => handle_ofp(&config, &service, cmd).await,
        Command::Config(_) | Command::Prefs(_) => Ok(()),
    }
}

async fn handle_run(
    mut config: Config,
    service: Arc<Service>,
    prefs_path: PathBuf,
    cmd: &RunCommand,
) -> anyhow::Result<()> {
    if let Some(port) = cmd.port {
        config.udp.bind_port = port;
    }

    let listener = DatagramListener::bind(&config.bind_addr())
        .await?
        .with_read_timeout(config.read_timeout())
        .with_max_datagram_bytes(config.udp.max_datagram_bytes);
    let metrics = listener.metrics();
    info!(
        addr = %listener.local_addr()?,
        api = %service.api().base_url(),
        "Bridge running"
    );

    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            ctrl_c.cancel();
        }
    });

    let listener_service = Arc::clone(&service);
    let listener_cancel = cancel.clone();
    let listener_task = tokio::spawn(async move {
        listener
            .run(listener_service.as_ref(), listener_cancel)
            .await
    });

    let selection = Preferences {
        airline_id: config.selection.airline_id,
        aircraft_id: config.selection.aircraft_id,
    };

    if cmd.headless {
        cancel.cancelled().await;
    } else {
        let mut console = Console::new(service, metrics, selection, prefs_path)
            .with_simbrief_user(config.simbrief_user().map(str::to_string));
        if let Err(e) = console.run(cancel.clone()).await {
            error!(error = %e, "Console failed");
        }
        cancel.cancel();
    }

    listener_task.await??;
    info!("Bridge stopped");

    // A pending stdin read holds a runtime thread until the next line.
    std::process::exit(0);
}

fn print_items(items: &[CatalogItem], json: bool) -> anyhow::Result<()> {
    if json {
        let rows: Vec<_> = items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "id": item.id(),
                    "title": item.title(),
                    "description": item.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if items.is_empty() {
        println!("No matches.");
    } else {
        for item in items {
            println!("{:>6}  {:<10} {}", item.id(), item.title(), item.description());
        }
    }
    Ok(())
}

async fn handle_airlines(service: &Service, cmd: &ListCommand) -> anyhow::Result<()> {
    let items = catalog::airline_items(service.airlines().await?);
    print_items(&catalog::filter(items, cmd.filter.as_deref()), cmd.json)
}

async fn handle_fleet(service: &Service, cmd: &ListCommand) -> anyhow::Result<()> {
    let items = catalog::aircraft_items(service.aircraft().await?);
    print_items(&catalog::filter(items, cmd.filter.as_deref()), cmd.json)
}

async fn handle_pireps(service: &Service, cmd: &PirepsCommand) -> anyhow::Result<()> {
    let reports = service.list_reports().await?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No PIREPs.");
    }
    for report in &reports {
        println!(
            "{:<12} {:<8} {} -> {}  {}",
            report.id, report.ident, report.dpt_airport_id, report.arr_airport_id, report.state
        );
    }
    Ok(())
}

async fn handle_ofp(config: &Config, service: &Service, cmd: OfpCommand) -> anyhow::Result<()> {
    let user = cmd
        .user
        .or_else(|| config.simbrief_user().map(str::to_string))
        .context("no SimBrief user; pass --user or set simbrief.user_id")?;
    let ofp = service.flight_plan(&user).await?;
    let plan = ofp.to_plan()?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Flight:    {} ({})", plan.flight_number, ofp.callsign());
        println!("Route:     {} -> {}", plan.departure, plan.arrival);
        if !plan.alternate.is_empty() {
            println!("Alternate: {}", plan.alternate);
        }
        println!("Level:     {} ft", plan.level);
        println!("Distance:  {} nm", plan.planned_distance);
        println!("Time:      {} min", plan.planned_flight_time);
        println!("Block:     {} kg", plan.block_fuel);
        println!("           {}", plan.route);
    }
    Ok(())
}

fn handle_prefs(path: &Path, cmd: PrefsCommand) -> anyhow::Result<()> {
    let mut prefs = Preferences::load(path)?;
    match cmd {
        PrefsCommand::Show => {
            let show = |id: Option<u32>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
            println!("Preferences: {}", path.display());
            println!("  Airline:  {}", show(prefs.airline_id));
            println!("  Aircraft: {}", show(prefs.aircraft_id));
            return Ok(());
        }
        PrefsCommand::SetAirline { id } => prefs.airline_id = Some(id),
        PrefsCommand::SetAircraft { id } => prefs.aircraft_id = Some(id),
        PrefsCommand::Clear => prefs = Preferences::default(),
    }
    prefs.save(path)?;
    println!("Saved {}", path.display());
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::extract_from(config_path)?.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("  Log level:          {}", config.log_level);
                println!();
                println!("[phpVMS]");
                println!("  Base URL:           {}", config.phpvms.base_url);
                println!("  API key:            {}", config.phpvms.api_key);
                println!("  Timeout (s):        {}", config.phpvms.timeout_secs);
                println!();
                println!("[UDP]");
                println!("  Bind address:       {}", config.bind_addr());
                println!("  Read timeout (ms):  {}", config.udp.read_timeout_ms);
                println!("  Max datagram:       {}", config.udp.max_datagram_bytes);
                println!();
                println!("[SimBrief]");
                println!(
                    "  User ID:            {}",
                    config.simbrief_user().unwrap_or("-")
                );
                println!("  Fetch URL:          {}", config.simbrief.fetch_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
