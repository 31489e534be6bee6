//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{ColoredString, Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use dashpad::core::config::Config;
use dashpad::core::errors::DashpadError;
use dashpad::daemon::loop_main::{DaemonArgs, DashpadDaemon, button_channel};
use dashpad::daemon::opener::{RecordingOpener, SystemOpener};
use dashpad::daemon::signals::SignalHandler;
use dashpad::engine::{Action, Dashboard};
use dashpad::logger::jsonl::JsonlConfig;
use dashpad::logger::{ActivityEvent, ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger};
use dashpad::protocol::payload_digest;
use dashpad::source::{SourceSpec, build_source};
use dashpad::surface::launchpad::{self, select_port};
use dashpad::surface::recording::RecordingSurface;
use dashpad::surface::{GRID_COLUMNS, GRID_ROWS, GridPos, Layer, PixelStyle};

/// dashpad: drive a Novation Launchpad from a file, command or URL.
#[derive(Debug, Parser)]
#[command(
    name = "dashpad",
    author,
    version,
    about = "Turn a Launchpad into a live dashboard",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Run arguments used when no subcommand is given.
    #[command(flatten)]
    monitor: MonitorArgs,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Drive the Launchpad from a source (the default).
    Monitor(MonitorArgs),
    /// Poll a source once and preview the grid it would produce.
    Check(CheckArgs),
    /// List MIDI ports and the one dashpad would pick.
    Devices,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct MonitorArgs {
    /// File path, `!shell command`, or http(s) URL. Falls back to `poll.source`.
    #[arg(value_name = "SOURCE")]
    source: Option<String>,
    /// Seconds between the end of one poll and the start of the next.
    #[arg(short, long, value_name = "SECONDS")]
    interval: Option<u64>,
    /// Case-insensitive substring of the MIDI port to use.
    #[arg(long, value_name = "NAME")]
    port: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct CheckArgs {
    /// File path, `!shell command`, or http(s) URL. Falls back to `poll.source`.
    #[arg(value_name = "SOURCE")]
    source: Option<String>,
    /// Tab to open in the preview (clamped to the last tab).
    #[arg(long, default_value_t = 0, value_name = "INDEX")]
    tab: usize,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<DashpadError> for CliError {
    fn from(err: DashpadError) -> Self {
        match err {
            DashpadError::InvalidConfig { .. }
            | DashpadError::MissingConfig { .. }
            | DashpadError::ConfigParse { .. }
            | DashpadError::InvalidSource { .. } => Self::User(err.to_string()),
            DashpadError::ChannelClosed { .. } => Self::Internal(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        None => run_monitor(cli, &cli.monitor),
        Some(Command::Monitor(args)) => run_monitor(cli, args),
        Some(Command::Check(args)) => run_check(cli, args),
        Some(Command::Devices) => run_devices(cli),
        Some(Command::Completions(args)) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── configuration ────────────────────

/// Config file + env, then the run flags layered on top and re-validated.
fn effective_config(cli: &Cli, args: &MonitorArgs) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(interval) = args.interval {
        config.poll.interval_secs = interval;
    }
    if let Some(port) = &args.port {
        config.device.port_hint = Some(port.clone());
    }
    if let Some(source) = &args.source {
        config.poll.source = Some(source.clone());
    }
    config.validate()?;
    Ok(config)
}

fn resolve_source(config: &Config) -> Result<SourceSpec, CliError> {
    let raw = config.poll.source.as_deref().ok_or_else(|| {
        CliError::User(
            "no source given: pass SOURCE, set DASHPAD_SOURCE, or set poll.source in the config"
                .to_string(),
        )
    })?;
    Ok(SourceSpec::parse(raw)?)
}

fn start_logger(
    config: &Config,
) -> Result<(ActivityLoggerHandle, Option<std::thread::JoinHandle<()>>), CliError> {
    if !config.logging.enabled {
        return Ok((ActivityLoggerHandle::disabled(), None));
    }
    let (handle, join) = spawn_logger(ActivityLoggerConfig {
        jsonl_config: JsonlConfig::from_config(config),
        ..ActivityLoggerConfig::default()
    })?;
    Ok((handle, Some(join)))
}

fn stop_logger(handle: &ActivityLoggerHandle, join: Option<std::thread::JoinHandle<()>>) {
    handle.shutdown();
    if let Some(join) = join
        && join.join().is_err()
    {
        eprintln!("[DASHPAD-DAEMON] logger thread panicked");
    }
}

// ──────────────────── monitor ────────────────────

fn run_monitor(cli: &Cli, args: &MonitorArgs) -> Result<(), CliError> {
    let config = effective_config(cli, args)?;
    let spec = resolve_source(&config)?;
    let source = build_source(&spec, &config)?;
    let config_hash = config.stable_hash()?;

    let (logger, logger_join) = start_logger(&config)?;
    let result = drive_launchpad(cli, &config, source, &logger, config_hash);
    stop_logger(&logger, logger_join);
    result.map_err(CliError::from)
}

fn drive_launchpad(
    cli: &Cli,
    config: &Config,
    source: Box<dyn dashpad::source::Source>,
    logger: &ActivityLoggerHandle,
    config_hash: String,
) -> dashpad::core::errors::Result<()> {
    let (events_tx, events_rx) = button_channel();
    let device = launchpad::connect(config.device.port_hint.as_deref(), events_tx)
        .inspect_err(|err| {
            logger.send(ActivityEvent::DeviceError {
                code: err.code().to_string(),
                message: err.to_string(),
            });
        })?;
    if !cli.quiet {
        eprintln!("[DASHPAD-MIDI] connected to {}", device.port_name);
    }

    let opener = SystemOpener::from_config(&config.opener, logger.clone()).verbose(cli.verbose);
    let dashboard = Dashboard::new(device.surface, opener);
    let mut daemon = DashpadDaemon::init(
        dashboard,
        source,
        events_rx,
        logger.clone(),
        SignalHandler::new(),
        DaemonArgs {
            interval: Duration::from_secs(config.poll.interval_secs),
            verbose: cli.verbose,
            quiet: cli.quiet,
            config_hash,
        },
    )?;
    let result = daemon.run();

    // The input connection must outlive the loop reading its events.
    drop(daemon);
    drop(device.input);
    result
}

// ──────────────────── check ────────────────────

#[derive(Debug, Serialize)]
struct CellView {
    x: u8,
    y: u8,
    #[serde(flatten)]
    style: PixelStyle,
}

#[derive(Debug, Serialize)]
struct ActionView<'a> {
    x: u8,
    y: u8,
    #[serde(flatten)]
    action: &'a Action,
}

fn run_check(cli: &Cli, args: &CheckArgs) -> Result<(), CliError> {
    let monitor = MonitorArgs {
        source: args.source.clone(),
        ..MonitorArgs::default()
    };
    let config = effective_config(cli, &monitor)?;
    let spec = resolve_source(&config)?;
    let mut source = build_source(&spec, &config)?;
    let mode = output_mode(cli);

    let state = match source.poll() {
        Ok(state) => state,
        Err(err) => {
            if mode == OutputMode::Json {
                write_json_line(&json!({
                    "command": "check",
                    "status": "error",
                    "source": spec.to_string(),
                    "error_code": err.code(),
                    "message": err.to_string(),
                }))?;
            }
            return Err(err.into());
        }
    };

    let digest = payload_digest(&state);
    let tab_count = state.tabs.len();
    let mut dashboard = Dashboard::new(RecordingSurface::new(), RecordingOpener::new());
    dashboard.set_state(state)?;
    dashboard.select_tab(args.tab)?;

    match mode {
        OutputMode::Human => print_preview(&spec, &digest, tab_count, &dashboard)?,
        OutputMode::Json => {
            let cells: Vec<CellView> = dashboard
                .surface()
                .lit(Layer::Content)
                .into_iter()
                .map(|(pos, style)| CellView {
                    x: pos.x,
                    y: pos.y,
                    style,
                })
                .collect();
            let actions: Vec<ActionView<'_>> = dashboard
                .actions()
                .iter()
                .map(|(pos, action)| ActionView {
                    x: pos.x,
                    y: pos.y,
                    action,
                })
                .collect();
            write_json_line(&json!({
                "command": "check",
                "status": "ok",
                "source": spec.to_string(),
                "tabs": tab_count,
                "digest": digest,
                "selected_tab": dashboard.selected_tab(),
                "cells": cells,
                "actions": actions,
            }))?;
        }
    }
    Ok(())
}

fn print_preview(
    spec: &SourceSpec,
    digest: &str,
    tab_count: usize,
    dashboard: &Dashboard<RecordingSurface, RecordingOpener>,
) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    writeln!(out, "{} {spec}", "source:".bold())?;
    write!(out, "{} {tab_count}", "tabs:".bold())?;
    if let Some(selected) = dashboard.selected_tab() {
        write!(out, " (showing {selected})")?;
    }
    writeln!(out, "  {} {digest}", "digest:".bold())?;
    writeln!(out)?;

    for y in 0..GRID_ROWS {
        let mut line = String::from("  ");
        for x in 0..GRID_COLUMNS {
            let style = GridPos::new(x, y)
                .map_or(PixelStyle::Off, |pos| dashboard.surface().shown(Layer::Content, pos));
            line.push_str(&cell_token(style).to_string());
        }
        writeln!(out, "{line}")?;
        if y == 0 {
            writeln!(out, "  {}", "-".repeat(usize::from(GRID_COLUMNS) * 4).dimmed())?;
        }
    }

    if !dashboard.actions().is_empty() {
        writeln!(out)?;
        for (pos, action) in dashboard.actions().iter() {
            let text = match action {
                Action::SelectTab { index } => format!("tab {index}"),
                Action::OpenLink { link } => link.clone(),
            };
            writeln!(out, "  {:<7} {text}", pos.to_string())?;
        }
    }
    Ok(())
}

/// Four-column rendering of one cell: palette index, `*` flash, `~` pulse.
fn cell_token(style: PixelStyle) -> ColoredString {
    match style {
        PixelStyle::Off => "   .".dimmed(),
        PixelStyle::Palette { color } => format!("{color:>4}").bold(),
        PixelStyle::Flash { color } => format!("{color:>3}*").bold().blink(),
        PixelStyle::Pulse { color } => format!("{color:>3}~").italic(),
        // Device channels are 7-bit.
        PixelStyle::Rgb { r, g, b } => "  ##".truecolor(
            r.saturating_mul(2),
            g.saturating_mul(2),
            b.saturating_mul(2),
        ),
    }
}

// ──────────────────── devices ────────────────────

fn run_devices(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let hint = config.device.port_hint.as_deref();
    let ports = launchpad::list_ports()?;
    let chosen_input = select_port(&ports.inputs, hint);
    let chosen_output = select_port(&ports.outputs, hint);

    match output_mode(cli) {
        OutputMode::Json => write_json_line(&json!({
            "command": "devices",
            "inputs": ports.inputs,
            "outputs": ports.outputs,
            "selected_input": chosen_input.and_then(|i| ports.inputs.get(i)),
            "selected_output": chosen_output.and_then(|i| ports.outputs.get(i)),
        }))?,
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            for (title, names, chosen) in [
                ("inputs", &ports.inputs, chosen_input),
                ("outputs", &ports.outputs, chosen_output),
            ] {
                writeln!(out, "{}", format!("MIDI {title}:").bold())?;
                if names.is_empty() {
                    writeln!(out, "  (none)")?;
                }
                for (i, name) in names.iter().enumerate() {
                    if Some(i) == chosen {
                        writeln!(out, "  {} {name}", "*".green())?;
                    } else {
                        writeln!(out, "    {name}")?;
                    }
                }
            }
            if chosen_input.is_none() || chosen_output.is_none() {
                writeln!(out, "{}", "no Launchpad port matched".yellow())?;
            }
        }
    }
    Ok(())
}

// ──────────────────── output helpers ────────────────────

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DASHPAD_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}
