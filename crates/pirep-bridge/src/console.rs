//! Line-oriented operator console.
//!
//! Each input line is parsed as a small clap command and run against the
//! shared [`FlightService`], concurrently with the telemetry listener.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::ReportApi;
use crate::error::{Error, Result};
use crate::listener::ListenerMetrics;
use crate::preferences::Preferences;
use crate::service::derive::{file_request_from_telemetry, round};
use crate::service::{FlightPlan, FlightService};

const PROMPT: &str = "pxp> ";

/// A console line.
#[derive(Debug, Parser)]
#[command(name = "pxp", no_binary_name = true)]
pub struct ConsoleLine {
    /// The command to run
    #[command(subcommand)]
    pub command: ConsoleCommand,
}

/// Commands accepted on the console.
#[derive(Debug, Subcommand)]
pub enum ConsoleCommand {
    /// Prefile a report from a manual flight plan
    Start(StartArgs),

    /// Prefile a report from the latest SimBrief flight plan
    Simbrief {
        /// Callsign to report (defaults to airline ICAO + flight number)
        #[arg(long)]
        callsign: Option<String>,
    },

    /// File the active report using the last telemetry
    File,

    /// Cancel the active report
    Cancel,

    /// Forget the active report without contacting the server
    Reset,

    /// Resume the latest in-progress report from the server
    Fetch,

    /// Refresh the active report's state from the server
    Sync,

    /// Show the active report and listener counters
    Status,

    /// Select the airline for new reports
    Airline {
        /// Airline ID
        id: u32,
    },

    /// Select the aircraft for new reports
    Aircraft {
        /// Aircraft ID
        id: u32,
    },

    /// Leave the console and stop the bridge
    #[command(alias = "exit")]
    Quit,
}

/// Manual flight plan.
#[derive(Debug, Args)]
pub struct StartArgs {
    /// Flight number
    pub flight: String,
    /// Departure ICAO
    pub departure: String,
    /// Arrival ICAO
    pub arrival: String,
    /// Cruise level, feet
    pub level: i64,
    /// Planned distance, nautical miles
    pub distance: i64,
    /// Planned time en route, minutes
    pub minutes: i64,
    /// Block fuel, kilograms
    pub block_fuel: i64,
    /// Alternate ICAO
    #[arg(long)]
    pub alt: Option<String>,
    /// Callsign to report (defaults to the flight number)
    #[arg(long)]
    pub callsign: Option<String>,
    /// Route
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub route: Vec<String>,
}

impl StartArgs {
    fn plan(&self) -> FlightPlan {
        FlightPlan {
            flight_number: self.flight.clone(),
            departure: self.departure.clone(),
            arrival: self.arrival.clone(),
            alternate: self.alt.clone().unwrap_or_default(),
            route: self.route.join(" "),
            level: self.level,
            planned_distance: self.distance,
            planned_flight_time: self.minutes,
            block_fuel: self.block_fuel,
        }
    }
}

/// What the loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print this and read the next line.
    Message(String),
    /// Nothing to print.
    Empty,
    /// Stop reading.
    Quit,
}

/// Parse one console line.
///
/// # Errors
///
/// Returns the clap error, which renders as usage text.
pub fn parse_line(line: &str) -> std::result::Result<ConsoleCommand, clap::Error> {
    ConsoleLine::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
}

/// Operator console bound to one service.
#[derive(Debug)]
pub struct Console<A> {
    service: Arc<FlightService<A>>,
    metrics: Arc<ListenerMetrics>,
    selection: Preferences,
    preferences_path: PathBuf,
    simbrief_user: Option<String>,
    block_fuel_kg: Option<i64>,
}

impl<A: ReportApi> Console<A> {
    /// Create a console.
    #[must_use]
    pub fn new(
        service: Arc<FlightService<A>>,
        metrics: Arc<ListenerMetrics>,
        selection: Preferences,
        preferences_path: PathBuf,
    ) -> Self {
        Self {
            service,
            metrics,
            selection,
            preferences_path,
            simbrief_user: None,
            block_fuel_kg: None,
        }
    }

    /// Set the SimBrief pilot used by `simbrief`.
    #[must_use]
    pub fn with_simbrief_user(mut self, user: Option<String>) -> Self {
        self.simbrief_user = user;
        self
    }

    /// Current airline and aircraft selection.
    #[must_use]
    pub fn selection(&self) -> Preferences {
        self.selection
    }

    /// Read commands from stdin until `quit`, end of input or cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin or stdout fails.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let input = BufReader::new(tokio::io::stdin());
        self.run_with(input, tokio::io::stdout(), cancel).await
    }

    /// Like [`run`](Self::run) with explicit input and output.
    ///
    /// `quit` cancels `cancel` so the rest of the bridge stops too.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn run_with<R, W>(
        &mut self,
        input: R,
        mut output: W,
        cancel: CancellationToken,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        loop {
            let line = tokio::select! {
                () = cancel.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                debug!("Console input closed");
                break;
            };

            match self.handle_line(&line).await {
                Reply::Quit => {
                    info!("Quit requested");
                    cancel.cancel();
                    break;
                }
                Reply::Message(message) => {
                    output.write_all(message.as_bytes()).await?;
                    if !message.ends_with('\n') {
                        output.write_all(b"\n").await?;
                    }
                }
                Reply::Empty => {}
            }
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;
        }
        Ok(())
    }

    /// Parse and run one line.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        if line.trim().is_empty() {
            return Reply::Empty;
        }
        match parse_line(line) {
            Ok(ConsoleCommand::Quit) => Reply::Quit,
            Ok(command) => match self.execute(command).await {
                Ok(message) => Reply::Message(message),
                Err(e) => Reply::Message(format!("error: {e}")),
            },
            Err(e) => Reply::Message(e.render().to_string()),
        }
    }

    /// Run one command and describe the result.
    ///
    /// # Errors
    ///
    /// Returns the service or preference error.
    pub async fn execute(&mut self, command: ConsoleCommand) -> Result<String> {
        match command {
            ConsoleCommand::Start(args) => {
                let callsign = args.callsign.clone().unwrap_or_else(|| args.flight.clone());
                self.prefile(&args.plan(), &callsign).await
            }
            ConsoleCommand::Simbrief { callsign } => {
                let user = self
                    .simbrief_user
                    .clone()
                    .ok_or_else(|| Error::invalid_input("simbrief", "no SimBrief user configured"))?;
                let ofp = self.service.flight_plan(&user).await?;
                let plan = ofp.to_plan()?;
                let callsign = callsign.unwrap_or_else(|| ofp.callsign());
                self.prefile(&plan, &callsign).await
            }
            ConsoleCommand::File => self.file().await,
            ConsoleCommand::Cancel => {
                self.service.cancel().await?;
                self.block_fuel_kg = None;
                Ok("PIREP cancelled".to_string())
            }
            ConsoleCommand::Reset => {
                self.service.reset_active().await;
                self.block_fuel_kg = None;
                Ok("Active PIREP cleared".to_string())
            }
            ConsoleCommand::Fetch => {
                let pirep = self.service.adopt_existing().await?;
                self.block_fuel_kg = Some(round(Some(pirep.block_fuel.kg)));
                Ok(format!(
                    "Resumed PIREP {} ({} {} -> {})",
                    pirep.id, pirep.ident, pirep.dpt_airport_id, pirep.arr_airport_id
                ))
            }
            ConsoleCommand::Sync => match self.service.sync_remote_state().await? {
                Some(state) => Ok(format!("Remote state: {state}")),
                None => Ok("Active PIREP not found on server".to_string()),
            },
            ConsoleCommand::Status => Ok(self.status().await),
            ConsoleCommand::Airline { id } => {
                self.selection.airline_id = Some(id);
                self.selection.save(&self.preferences_path)?;
                Ok(format!("Airline {id} selected"))
            }
            ConsoleCommand::Aircraft { id } => {
                self.selection.aircraft_id = Some(id);
                self.selection.save(&self.preferences_path)?;
                Ok(format!("Aircraft {id} selected"))
            }
            ConsoleCommand::Quit => Ok(String::new()),
        }
    }

    async fn prefile(&mut self, plan: &FlightPlan, callsign: &str) -> Result<String> {
        let request = plan.to_prefile(
            self.selection.airline_id.unwrap_or(0),
            self.selection.aircraft_id.unwrap_or(0),
            callsign,
        )?;
        let id = self.service.prefile(&request).await?;
        self.block_fuel_kg = Some(plan.block_fuel);
        Ok(format!(
            "PIREP {id} started: {} {} -> {}",
            callsign, request.departure_airport_id, request.arrival_airport_id
        ))
    }

    async fn file(&mut self) -> Result<String> {
        let block_fuel = self
            .block_fuel_kg
            .ok_or_else(|| Error::invalid_input("fuel", "no block fuel recorded"))?;
        let last = self.metrics.snapshot();
        let request = file_request_from_telemetry(
            block_fuel,
            last.last_fuel,
            last.last_flight_time,
            last.last_distance,
        )?;
        self.service.file(&request).await?;
        self.block_fuel_kg = None;
        Ok(format!(
            "PIREP filed: {} min, {} nm, {} lbs used",
            request.flight_time, request.distance, request.fuel_used_lbs
        ))
    }

    async fn status(&self) -> String {
        let report = self.service.snapshot().await;
        let metrics = self.metrics.snapshot();
        let mut out = String::new();

        let _ = writeln!(out, "PIREP:    {}", report.id.as_deref().unwrap_or("none"));
        let _ = writeln!(out, "State:    {}", report.state);
        if let Some(baseline) = report.fuel_baseline_kg {
            let _ = writeln!(out, "Baseline: {baseline} kg");
        }
        let _ = writeln!(
            out,
            "Airline:  {}  Aircraft: {}",
            display_id(self.selection.airline_id),
            display_id(self.selection.aircraft_id)
        );
        let _ = writeln!(
            out,
            "Packets:  {} ({} bad)",
            metrics.packets_any, metrics.packets_err
        );
        if let Some(sender) = &metrics.last_sender {
            let when = metrics
                .last_packet_time
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default();
            let _ = writeln!(out, "Sender:   {sender} at {when}");
        }
        if let Some(head) = &metrics.last_non_json_head {
            let _ = writeln!(out, "Bad head: {head}");
        }
        if let Some(status) = &metrics.last_status {
            let _ = writeln!(out, "Phase:    {status}");
        }
        if let Some((lat, lon)) = metrics
            .last_position
            .as_ref()
            .and_then(|position| position.coordinates())
        {
            let _ = writeln!(out, "Position: {lat:.4}, {lon:.4}");
        }
        if let Some(fuel) = metrics.last_fuel {
            let _ = writeln!(out, "Fuel:     {fuel:.0} kg");
        }
        let _ = writeln!(out, "Update:   {}", metrics.flight_update);
        let _ = write!(out, "Position update: {}", metrics.position_update);
        out
    }
}

fn display_id(id: Option<u32>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}
