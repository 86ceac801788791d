//! Command dispatcher: turns parsed arguments into core calls.
//!
//! Process state (environment variables) is read once into [`Environment`]
//! and passed down explicitly, so every path here can be driven by tests
//! with `chamelium_core::mock::MockDevice`.

use std::fs;
use std::io::Write;
use std::path::Path;

use chamelium_core::capture::{self, parse_area, ScreenshotRequest};
use chamelium_core::config::{resolve_address, ADDRESS_ENV, VIEWER_ENV};
use chamelium_core::device::Device;
use chamelium_core::edid::{self, EdidSource};
use chamelium_core::errors::ChameliumError;
use chamelium_core::hotplug::{self, PulseRequest};
use chamelium_core::output::OutputTarget;
use chamelium_core::rpc::RpcDevice;

use crate::cli::{Cli, Command, EdidCommand, PulseArgs, ScreenshotArgs};

/// Environment variables the tool reads.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// `$CHAMELEON_IP`
    pub chameleon_ip: Option<String>,
    /// `$CHAMELEON_VIEWER`
    pub viewer: Option<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            chameleon_ip: std::env::var(ADDRESS_ENV).ok(),
            viewer: std::env::var(VIEWER_ENV).ok(),
        }
    }
}

/// Resolve the board address, connect, and run the command.
///
/// Screenshot options are checked first, so a contradictory invocation is
/// reported as such even when no address is configured.
pub fn run(cli: &Cli, env: &Environment, out: &mut dyn Write) -> Result<(), ChameliumError> {
    let screenshot_request = match &cli.command {
        Command::Screenshot(args) => {
            let request = screenshot_request(args)?;
            request.validate()?;
            Some(request)
        }
        _ => None,
    };

    let address = resolve_address(
        cli.command.device_options().chameleon.as_deref(),
        cli.global.chameleon.as_deref(),
        env.chameleon_ip.as_deref(),
    )?;
    log::debug!("using chameleond at {address}");
    let device = RpcDevice::connect(address);
    match screenshot_request {
        Some(request) => screenshot(&device, &request, env, out),
        None => execute(&cli.command, &device, env, out),
    }
}

/// Run `command` against `device`.
pub fn execute(
    command: &Command,
    device: &dyn Device,
    env: &Environment,
    out: &mut dyn Write,
) -> Result<(), ChameliumError> {
    match command {
        Command::Status { json, .. } => status(device, *json, out),
        Command::Plug { ports, .. } => hotplug::plug(device, ports, out),
        Command::Unplug { ports, .. } => hotplug::unplug(device, ports, out),
        Command::Pulse(args) => hotplug::pulse(device, &pulse_request(args), out),
        Command::Reset { .. } => hotplug::reset(device, out),
        Command::Edid { command } => edid_command(command, device, out),
        Command::Screenshot(args) => screenshot(device, &screenshot_request(args)?, env, out),
    }
}

fn screenshot(
    device: &dyn Device,
    request: &ScreenshotRequest,
    env: &Environment,
    out: &mut dyn Write,
) -> Result<(), ChameliumError> {
    let report = capture::take_screenshot(device, request, env.viewer.as_deref(), out)?;
    log::info!(
        "captured {} frame(s) of {} from port {}",
        report.frames.len(),
        report.area,
        report.port
    );
    Ok(())
}

fn status(device: &dyn Device, json: bool, out: &mut dyn Write) -> Result<(), ChameliumError> {
    let statuses = hotplug::port_statuses(device)?;
    let rendered = if json {
        let mut text = serde_json::to_string_pretty(&statuses)
            .map_err(|e| ChameliumError::Conversion(format!("status JSON: {e}")))?;
        text.push('\n');
        text
    } else {
        hotplug::render_status_table(&statuses)
    };
    out.write_all(rendered.as_bytes())
        .map_err(|e| ChameliumError::filesystem("<stdout>", e))
}

fn pulse_request(args: &PulseArgs) -> PulseRequest {
    PulseRequest {
        port: args.port,
        deassert_interval_ms: args.deassert_interval,
        assert_interval_ms: args.assert_interval,
        count: args.count,
        end_level: args.end_level.into(),
    }
}

fn edid_command(command: &EdidCommand, device: &dyn Device, out: &mut dyn Write) -> Result<(), ChameliumError> {
    match command {
        EdidCommand::Get { port, output, .. } => {
            let mut target = OutputTarget::from_arg(output.as_deref());
            edid::dump(device, *port, &mut target)
        }
        EdidCommand::Set {
            port,
            source,
            no_replug,
            ..
        } => {
            let source = match &source.edid_file {
                Some(path) => EdidSource::Blob(read_file(path)?),
                None => EdidSource::Default,
            };
            edid::set(device, *port, &source, !no_replug, out)
        }
    }
}

/// Build the capture request; local files are read before the board is used.
fn screenshot_request(args: &ScreenshotArgs) -> Result<ScreenshotRequest, ChameliumError> {
    let area = args.area.as_deref().map(parse_area).transpose()?;
    let edid = args.edid_file.as_deref().map(read_file).transpose()?;
    Ok(ScreenshotRequest {
        replug: args.replug,
        edid,
        area,
        port: args.port,
        count: args.count,
        output: args.output.clone(),
        viewer: args.view.clone(),
        output_dir: args.output_dir.clone(),
        file_prefix: args.file_prefix.clone(),
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, ChameliumError> {
    fs::read(path).map_err(|e| ChameliumError::filesystem(path, e))
}
